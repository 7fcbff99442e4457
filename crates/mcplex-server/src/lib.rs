//! Server engine for the MCP protocol: capability registry, dispatcher,
//! per-session protocol state machine, and the blocking facade.
//!
//! # Architecture
//!
//! - [`McpServer`] owns the tool/resource/prompt/completion tables and
//!   the handler map; it is bound to exactly one transport and mutated at
//!   runtime through `add_*`/`remove_*` operations that broadcast
//!   list-changed notifications when declared.
//! - [`Session`] is one connection's protocol state machine: handshake,
//!   inbound dispatch, and correlation of server-initiated requests.
//! - [`ServerExchange`] is the handle every handler receives: client
//!   identity, the logging gate, and the two server→client calls
//!   (`roots/list`, `sampling/createMessage`).
//! - [`SyncMcpServer`] is the blocking facade; sync handlers run on the
//!   runtime's blocking pool, never on the shared dispatch path.
//!
//! # Example
//!
//! ```rust,no_run
//! use mcplex_core::capability::ServerCapabilities;
//! use mcplex_core::types::{CallToolResult, Tool};
//! use mcplex_server::{McpServer, ToolSpec};
//! use mcplex_transport::MemoryServerTransport;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), mcplex_core::McpError> {
//! let echo = ToolSpec::new(
//!     Tool::new("echo").description("Echo the arguments back"),
//!     |_exchange, args| async move { Ok(CallToolResult::text(args.to_string())) },
//! )?;
//!
//! let server = McpServer::builder("demo-server", "0.1.0")
//!     .capabilities(ServerCapabilities::new().with_tools(true))
//!     .tool(echo)
//!     .connect(Arc::new(MemoryServerTransport::new()))
//!     .await?;
//! # let _ = server;
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod exchange;
pub mod server;
pub mod session;
pub mod spec;
pub mod sync;

pub use exchange::ServerExchange;
pub use server::{McpServer, McpServerBuilder, RootsChangeListener};
pub use session::{Handshake, Session, SessionState, DEFAULT_REQUEST_TIMEOUT};
pub use spec::{
    CompletionSpec, PromptSpec, ResourceSpec, ResourceTemplateSpec, ToolSpec,
};
pub use sync::{
    SyncCompletionSpec, SyncMcpServer, SyncPromptSpec, SyncResourceSpec, SyncServerExchange,
    SyncToolSpec,
};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::exchange::ServerExchange;
    pub use crate::server::{McpServer, McpServerBuilder, RootsChangeListener};
    pub use crate::session::{Handshake, Session, SessionState, DEFAULT_REQUEST_TIMEOUT};
    pub use crate::spec::{
        CompletionSpec, PromptSpec, ResourceSpec, ResourceTemplateSpec, ToolSpec,
    };
    pub use crate::sync::{
        SyncCompletionSpec, SyncMcpServer, SyncPromptSpec, SyncResourceSpec, SyncServerExchange,
        SyncToolSpec,
    };
}
