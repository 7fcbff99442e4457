//! # mcplex
//!
//! An MCP server engine for Rust: a JSON-RPC capability-exposure protocol
//! where a server lets a client-driven model discover and invoke tools,
//! read resources, retrieve prompt templates, and request completions,
//! and can itself query the client for workspace roots or a model
//! sampling.
//!
//! The engine is transport-independent. Three crates compose it:
//!
//! - [`mcplex_core`] (re-exported as [`core`]): wire types, capability
//!   negotiation, errors
//! - [`mcplex_transport`] (re-exported as [`transport`]): the transport
//!   contract, the stdio reference transport, an in-memory transport, and
//!   an HTTP/SSE binding behind the `http` feature
//! - [`mcplex_server`] (re-exported as [`server`]): registry &
//!   dispatcher, session state machine, exchange handle, sync facade
//!
//! # Example
//!
//! ```rust,no_run
//! use mcplex::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), McpError> {
//!     let time = ToolSpec::new(
//!         Tool::new("time").description("Current unix time"),
//!         |_exchange, _args| async move {
//!             let now = std::time::SystemTime::now()
//!                 .duration_since(std::time::UNIX_EPOCH)
//!                 .map_err(|err| McpError::internal(err.to_string()))?;
//!             Ok(CallToolResult::text(now.as_secs().to_string()))
//!         },
//!     )?;
//!
//!     let transport = Arc::new(StdioServerTransport::new());
//!     let server = McpServer::builder("time-server", "0.1.0")
//!         .capabilities(ServerCapabilities::new().with_tools(true).with_logging())
//!         .instructions("Call the time tool for the current unix time.")
//!         .tool(time)
//!         .connect(transport)
//!         .await?;
//!
//!     // stdio serves until stdin reaches EOF
//!     tokio::signal::ctrl_c().await.ok();
//!     server.shutdown().await;
//!     Ok(())
//! }
//! ```

#![deny(missing_docs)]

pub use mcplex_core as core;
pub use mcplex_server as server;
pub use mcplex_transport as transport;

/// Prelude module pulling in the whole public surface.
pub mod prelude {
    pub use mcplex_core::prelude::*;
    pub use mcplex_server::prelude::*;
    pub use mcplex_transport::prelude::*;
}
