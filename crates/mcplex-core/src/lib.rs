//! # mcplex-core
//!
//! Core wire types and protocol machinery for the mcplex MCP server
//! engine:
//!
//! - **JSON-RPC envelope**: request/response/notification frames with
//!   correlation ids and the sealed error-code set
//! - **Capability negotiation**: server/client capability flags, the
//!   `initialize` handshake shapes, protocol version negotiation
//! - **Typed payloads**: tools, resources, prompts, completions,
//!   sampling, roots, logging
//! - **URI templates**: matching `{variable}` placeholders for
//!   templated resources
//! - **Error handling**: the unified [`error::McpError`] type
//!
//! This crate is runtime-agnostic: it depends on no async runtime and no
//! transport. Everything here is pure data plus validation.
//!
//! # Example
//!
//! ```rust
//! use mcplex_core::capability::{negotiate_version, ServerCapabilities};
//! use mcplex_core::types::Tool;
//!
//! let caps = ServerCapabilities::new().with_tools(true).with_logging();
//! assert!(caps.has_tools());
//!
//! let tool = Tool::new("search").description("Search the index");
//! assert_eq!(tool.name, "search");
//!
//! assert_eq!(negotiate_version("2024-11-05"), "2024-11-05");
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::unwrap_used)]
#![allow(clippy::module_name_repetitions)]

pub mod capability;
pub mod error;
pub mod jsonrpc;
pub mod methods;
pub mod types;
pub mod uri_template;

pub use capability::{
    negotiate_version, ClientCapabilities, Implementation, InitializeRequest, InitializeResult,
    ServerCapabilities, LATEST_PROTOCOL_VERSION, SUPPORTED_PROTOCOL_VERSIONS,
};
pub use error::McpError;
pub use jsonrpc::{ErrorCode, ErrorData, Message, Notification, Request, RequestId, Response};
pub use uri_template::UriTemplate;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust
/// use mcplex_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::capability::{
        negotiate_version, ClientCapabilities, Implementation, InitializeRequest, InitializeResult,
        ServerCapabilities, LATEST_PROTOCOL_VERSION, SUPPORTED_PROTOCOL_VERSIONS,
    };
    pub use crate::error::McpError;
    pub use crate::jsonrpc::{
        ErrorCode, ErrorData, Message, Notification, Request, RequestId, Response,
    };
    pub use crate::types::{
        CallToolRequest, CallToolResult, CompleteRequest, CompleteResult, Completion,
        CompletionReference, Content, CreateMessageRequest, CreateMessageResult, GetPromptRequest,
        GetPromptResult, ListPromptsResult, ListResourceTemplatesResult, ListResourcesResult,
        ListRootsResult, ListToolsResult, LoggingLevel, LoggingMessageNotification, Prompt,
        PromptArgument, PromptMessage, ReadResourceRequest, ReadResourceResult, Resource,
        ResourceContents, ResourceTemplate, Role, Root, SamplingMessage, SetLevelRequest, Tool,
    };
    pub use crate::uri_template::UriTemplate;
}

#[cfg(test)]
mod tests {
    use super::prelude::*;

    #[test]
    fn prelude_is_usable() {
        let _tool = Tool::new("t");
        let _caps = ServerCapabilities::new().with_prompts(false);
        let _msg: Message = Notification::new("notifications/initialized").into();
        assert_eq!(negotiate_version("bogus"), LATEST_PROTOCOL_VERSION);
    }
}
