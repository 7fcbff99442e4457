//! Transport error types.

use mcplex_core::error::McpError;
use thiserror::Error;

/// Errors raised by transport operations.
///
/// Transport failures are isolated to the session they occur on: the
/// session is torn down and siblings continue undisturbed.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum TransportError {
    /// I/O failure on the underlying stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A frame could not be encoded or decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The peer went away.
    #[error("Connection closed")]
    ConnectionClosed,

    /// The connection was never established or already torn down.
    #[error("Not connected")]
    NotConnected,

    /// The transport is shutting down and accepts no new work.
    #[error("Transport shutting down")]
    ShuttingDown,

    /// The peer violated the framing or session rules.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the violation.
        message: String,
    },
}

impl TransportError {
    /// Create a protocol-violation error.
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }
}

impl From<TransportError> for McpError {
    fn from(err: TransportError) -> Self {
        let message = err.to_string();
        Self::transport_with_source(message, err)
    }
}
