//! The contract any physical channel must satisfy to plug into the engine.
//!
//! Three pieces cooperate:
//!
//! - [`Connection`]: one session's outbound half. Frames enqueued through
//!   [`Connection::send`] are delivered in enqueue order, never
//!   interleaved mid-frame.
//! - [`SessionHandle`]: the engine side of a session, as the transport
//!   sees it. Transports feed inbound frames through
//!   [`SessionHandle::accept`] and may dispatch them concurrently.
//! - [`ServerTransport`]: the provider. It accepts a [`SessionFactory`],
//!   builds one session per raw connection, broadcasts notifications with
//!   per-session error isolation, and shuts down gracefully.

use crate::error::TransportError;
use async_trait::async_trait;
use mcplex_core::jsonrpc::{Message, Notification};
use mcplex_core::McpError;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use uuid::Uuid;

/// The outbound half of one session's connection.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Enqueue a frame for delivery.
    ///
    /// Completes once the frame has been accepted into the ordered
    /// outbound path (for the stdio transport, once the writer has put it
    /// on the wire). Frames from one connection are never reordered or
    /// interleaved.
    async fn send(&self, message: Message) -> Result<(), TransportError>;

    /// Flush queued frames, then close.
    async fn close_gracefully(&self) -> Result<(), TransportError>;

    /// Close immediately, abandoning queued frames.
    fn close(&self);

    /// Whether the connection can still carry frames.
    fn is_open(&self) -> bool;
}

/// Blanket extension methods for [`Connection`].
pub trait ConnectionExt: Connection {
    /// Decode an untyped payload into the handler's parameter type.
    fn unmarshal<T: DeserializeOwned>(
        &self,
        value: serde_json::Value,
    ) -> Result<T, TransportError> {
        serde_json::from_value(value).map_err(TransportError::from)
    }
}

impl<C: Connection + ?Sized> ConnectionExt for C {}

/// The engine side of a session, as seen by its transport.
#[async_trait]
pub trait SessionHandle: Send + Sync {
    /// The session's opaque id.
    fn id(&self) -> Uuid;

    /// Dispatch one inbound frame.
    ///
    /// Transports may call this concurrently for frames of the same
    /// session; inbound frames complete in no particular order.
    async fn accept(&self, message: Message);

    /// Deliver a notification to this session's client.
    async fn notify(&self, notification: Notification) -> Result<(), McpError>;

    /// Ask the session to wind down: fail pending requests, close the
    /// connection once queued frames are out.
    async fn close_gracefully(&self);

    /// Tear the session down immediately.
    fn close(&self);
}

/// Builds the engine's session from a freshly accepted raw connection.
pub type SessionFactory =
    Arc<dyn Fn(Arc<dyn Connection>) -> Arc<dyn SessionHandle> + Send + Sync>;

/// A transport provider: owns the physical channel and its sessions.
#[async_trait]
pub trait ServerTransport: Send + Sync {
    /// Start accepting connections, building a session for each through
    /// the factory.
    async fn serve(&self, factory: SessionFactory) -> Result<(), TransportError>;

    /// Deliver a notification to every open session.
    ///
    /// One session's delivery failure is logged and skipped; delivery to
    /// the remaining sessions continues. Broadcast itself never fails.
    async fn broadcast(&self, notification: Notification);

    /// Graceful shutdown: stop accepting connections, ask every session
    /// to close, and wait a bounded time for in-flight writes to drain.
    async fn shutdown(&self);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct NullConnection {
        open: AtomicBool,
    }

    #[async_trait]
    impl Connection for NullConnection {
        async fn send(&self, _message: Message) -> Result<(), TransportError> {
            Ok(())
        }

        async fn close_gracefully(&self) -> Result<(), TransportError> {
            self.open.store(false, Ordering::SeqCst);
            Ok(())
        }

        fn close(&self) {
            self.open.store(false, Ordering::SeqCst);
        }

        fn is_open(&self) -> bool {
            self.open.load(Ordering::SeqCst)
        }
    }

    #[tokio::test]
    async fn unmarshal_decodes_typed_params() {
        let conn = NullConnection {
            open: AtomicBool::new(true),
        };

        #[derive(serde::Deserialize)]
        struct Params {
            uri: String,
        }

        let params: Params = conn
            .unmarshal(serde_json::json!({"uri": "db://tables/users"}))
            .unwrap();
        assert_eq!(params.uri, "db://tables/users");

        let bad: Result<Params, _> = conn.unmarshal(serde_json::json!({"nope": 1}));
        assert!(bad.is_err());
    }
}
