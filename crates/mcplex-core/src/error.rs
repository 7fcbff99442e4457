//! Unified error handling for the engine.
//!
//! A single context-rich [`McpError`] flows through every layer. Errors
//! that reach a session's dispatch boundary are converted into JSON-RPC
//! error responses via [`McpError::to_error_data`]; they never escape into
//! a transport's I/O loop.
//!
//! The split between failure classes follows the protocol design:
//!
//! - **Validation**: malformed input rejected before dispatch
//! - **Not found**: unknown tool/resource/prompt/completion/session,
//!   returned as a normal error result, never fatal
//! - **Capability not declared**: registry mutation against an
//!   undeclared capability, rejected at the registry boundary
//! - **Transport**: write/decode/disconnect failures, isolated to the
//!   affected session

use crate::jsonrpc::{ErrorCode, ErrorData};
use miette::Diagnostic;
use std::time::Duration;
use thiserror::Error;

/// The primary error type for the engine.
#[derive(Error, Diagnostic, Debug)]
#[non_exhaustive]
pub enum McpError {
    /// A required field was missing, blank, or malformed.
    #[error("Validation failed: {message}")]
    #[diagnostic(code(mcplex::validation))]
    Validation {
        /// What was wrong with the input.
        message: String,
    },

    /// No tool registered under the requested name.
    #[error("Unknown tool: {name}")]
    #[diagnostic(code(mcplex::tool::not_found))]
    ToolNotFound {
        /// The requested tool name.
        name: String,
    },

    /// No resource matches the requested URI, exactly or by template.
    #[error("Unknown resource: {uri}")]
    #[diagnostic(
        code(mcplex::resource::not_found),
        help("Verify the URI against resources/list and resources/templates/list")
    )]
    ResourceNotFound {
        /// The requested URI.
        uri: String,
    },

    /// No prompt registered under the requested name.
    #[error("Unknown prompt: {name}")]
    #[diagnostic(code(mcplex::prompt::not_found))]
    PromptNotFound {
        /// The requested prompt name.
        name: String,
    },

    /// No completion handler registered for the requested reference.
    #[error("No completion handler for reference: {reference}")]
    #[diagnostic(code(mcplex::completion::not_found))]
    CompletionNotFound {
        /// The reference key (prompt name or resource-template URI).
        reference: String,
    },

    /// No session with the given id.
    #[error("Unknown session: {id}")]
    #[diagnostic(code(mcplex::session::not_found))]
    SessionNotFound {
        /// The requested session id.
        id: String,
    },

    /// The session was closed while an operation was outstanding.
    #[error("Session closed")]
    #[diagnostic(code(mcplex::session::closed))]
    SessionClosed,

    /// An operation was attempted against a capability the server never
    /// declared at construction.
    #[error("Capability not declared: {capability}")]
    #[diagnostic(
        code(mcplex::capability::not_declared),
        help("Declare the capability when building the server")
    )]
    CapabilityNotDeclared {
        /// The missing capability, e.g. `tools`.
        capability: String,
    },

    /// A registry key collision; the existing entry is left untouched.
    #[error("{entity} already registered: {key}")]
    #[diagnostic(code(mcplex::registry::duplicate))]
    AlreadyRegistered {
        /// The kind of entry, e.g. `tool`.
        entity: String,
        /// The colliding key.
        key: String,
    },

    /// The method does not exist on this server.
    #[error("Method not found: {method}")]
    #[diagnostic(code(mcplex::protocol::method_not_found))]
    MethodNotFound {
        /// The requested method.
        method: String,
    },

    /// Parameters did not match what the method expects.
    #[error("Invalid params for '{method}': {message}")]
    #[diagnostic(code(mcplex::protocol::invalid_params))]
    InvalidParams {
        /// The method being invoked.
        method: String,
        /// What was wrong.
        message: String,
    },

    /// The request frame itself was unacceptable.
    #[error("Invalid request: {message}")]
    #[diagnostic(code(mcplex::protocol::invalid_request))]
    InvalidRequest {
        /// What was wrong.
        message: String,
    },

    /// A transport-level failure: write failed, peer disconnected, frame
    /// could not be decoded.
    #[error("Transport error: {message}")]
    #[diagnostic(code(mcplex::transport))]
    Transport {
        /// Description of the failure.
        message: String,
        /// The underlying error, if available.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A server-initiated request was not answered in time.
    #[error("Timeout after {duration:?} waiting for {operation}")]
    #[diagnostic(
        code(mcplex::timeout),
        help("Consider raising the request timeout on the server builder")
    )]
    Timeout {
        /// The operation that timed out.
        operation: String,
        /// How long we waited.
        duration: Duration,
    },

    /// Protocol handshake failed.
    #[error("Handshake failed: {message}")]
    #[diagnostic(code(mcplex::handshake))]
    Handshake {
        /// What went wrong during initialization.
        message: String,
    },

    /// JSON encode/decode failure.
    #[error("Serialization error")]
    #[diagnostic(code(mcplex::serialization))]
    Serialization(#[from] serde_json::Error),

    /// An unexpected internal failure.
    #[error("Internal error: {message}")]
    #[diagnostic(code(mcplex::internal), severity(error))]
    Internal {
        /// Description of the failure.
        message: String,
    },
}

impl McpError {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a tool-not-found error.
    pub fn tool_not_found(name: impl Into<String>) -> Self {
        Self::ToolNotFound { name: name.into() }
    }

    /// Create a resource-not-found error.
    pub fn resource_not_found(uri: impl Into<String>) -> Self {
        Self::ResourceNotFound { uri: uri.into() }
    }

    /// Create a prompt-not-found error.
    pub fn prompt_not_found(name: impl Into<String>) -> Self {
        Self::PromptNotFound { name: name.into() }
    }

    /// Create a completion-not-found error.
    pub fn completion_not_found(reference: impl Into<String>) -> Self {
        Self::CompletionNotFound {
            reference: reference.into(),
        }
    }

    /// Create a capability-not-declared error.
    pub fn capability_not_declared(capability: impl Into<String>) -> Self {
        Self::CapabilityNotDeclared {
            capability: capability.into(),
        }
    }

    /// Create a duplicate-registration error.
    pub fn already_registered(entity: impl Into<String>, key: impl Into<String>) -> Self {
        Self::AlreadyRegistered {
            entity: entity.into(),
            key: key.into(),
        }
    }

    /// Create a method-not-found error.
    pub fn method_not_found(method: impl Into<String>) -> Self {
        Self::MethodNotFound {
            method: method.into(),
        }
    }

    /// Create an invalid-params error.
    pub fn invalid_params(method: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParams {
            method: method.into(),
            message: message.into(),
        }
    }

    /// Create an invalid-request error.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Create a transport error from a message.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            source: None,
        }
    }

    /// Create a transport error wrapping an underlying error.
    pub fn transport_with_source<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Transport {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a timeout error.
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// The JSON-RPC error code this error maps to on the wire.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Validation { .. } | Self::InvalidParams { .. } => ErrorCode::InvalidParams,
            Self::ToolNotFound { .. }
            | Self::PromptNotFound { .. }
            | Self::CompletionNotFound { .. } => ErrorCode::InvalidParams,
            Self::ResourceNotFound { .. } => ErrorCode::ResourceNotFound,
            Self::MethodNotFound { .. } => ErrorCode::MethodNotFound,
            Self::InvalidRequest { .. } => ErrorCode::InvalidRequest,
            Self::Serialization(_) => ErrorCode::ParseError,
            Self::Transport { .. } => ErrorCode::Other(-32000),
            Self::Timeout { .. } => ErrorCode::Other(-32001),
            Self::SessionClosed => ErrorCode::Other(-32003),
            Self::SessionNotFound { .. } => ErrorCode::Other(-32004),
            Self::Handshake { .. } => ErrorCode::Other(-32005),
            Self::CapabilityNotDeclared { .. } => ErrorCode::Other(-32006),
            Self::AlreadyRegistered { .. } => ErrorCode::Other(-32007),
            Self::Internal { .. } => ErrorCode::InternalError,
        }
    }

    /// Whether this is one of the not-found variants.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::ToolNotFound { .. }
                | Self::ResourceNotFound { .. }
                | Self::PromptNotFound { .. }
                | Self::CompletionNotFound { .. }
                | Self::SessionNotFound { .. }
        )
    }

    /// Convert into the wire-level error body.
    #[must_use]
    pub fn to_error_data(&self) -> ErrorData {
        ErrorData::new(self.code(), self.to_string())
    }
}

impl From<std::io::Error> for McpError {
    fn from(err: std::io::Error) -> Self {
        Self::Transport {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

impl From<ErrorData> for McpError {
    fn from(err: ErrorData) -> Self {
        match err.code {
            ErrorCode::MethodNotFound => Self::MethodNotFound {
                method: err.message,
            },
            ErrorCode::ResourceNotFound => Self::ResourceNotFound { uri: err.message },
            ErrorCode::InvalidParams => Self::Validation {
                message: err.message,
            },
            ErrorCode::InvalidRequest => Self::InvalidRequest {
                message: err.message,
            },
            _ => Self::Internal {
                message: format!("peer returned error {}: {}", err.code, err.message),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_map_to_wire_values() {
        assert_eq!(
            McpError::tool_not_found("foo").code(),
            ErrorCode::InvalidParams
        );
        assert_eq!(
            McpError::resource_not_found("x://y").code(),
            ErrorCode::ResourceNotFound
        );
        assert_eq!(
            McpError::method_not_found("nope").code(),
            ErrorCode::MethodNotFound
        );
        assert_eq!(McpError::SessionClosed.code(), ErrorCode::Other(-32003));
        assert_eq!(
            McpError::capability_not_declared("tools").code(),
            ErrorCode::Other(-32006)
        );
    }

    #[test]
    fn not_found_predicate() {
        assert!(McpError::tool_not_found("a").is_not_found());
        assert!(McpError::prompt_not_found("b").is_not_found());
        assert!(!McpError::internal("c").is_not_found());
    }

    #[test]
    fn error_data_carries_message() {
        let data = McpError::already_registered("tool", "echo").to_error_data();
        assert!(data.message.contains("echo"));
        assert_eq!(data.code, ErrorCode::Other(-32007));
    }

    #[test]
    fn io_error_becomes_transport() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe gone");
        let err: McpError = io.into();
        assert!(matches!(err, McpError::Transport { .. }));
        assert!(err.to_string().contains("pipe gone"));
    }
}
