//! In-memory transport for tests and in-process wiring.
//!
//! Sessions are backed by plain channels. A [`MemoryClient`] plays the
//! client side: it injects inbound frames and observes everything the
//! server sends. Connections can be put into a failing state to exercise
//! broadcast error isolation.

use crate::error::TransportError;
use crate::traits::{Connection, ServerTransport, SessionFactory, SessionHandle};
use async_trait::async_trait;
use dashmap::DashMap;
use mcplex_core::jsonrpc::{Message, Notification};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use tokio::sync::mpsc;
use uuid::Uuid;

/// A transport provider whose connections live entirely in memory.
#[derive(Default)]
pub struct MemoryServerTransport {
    factory: OnceLock<SessionFactory>,
    sessions: DashMap<Uuid, Arc<dyn SessionHandle>>,
    closing: AtomicBool,
}

impl MemoryServerTransport {
    /// Create an idle transport; call [`ServerTransport::serve`] before
    /// connecting clients.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept a new in-memory connection, building its session through
    /// the installed factory.
    pub fn connect(&self) -> Result<MemoryClient, TransportError> {
        if self.closing.load(Ordering::SeqCst) {
            return Err(TransportError::ShuttingDown);
        }
        let factory = self
            .factory
            .get()
            .ok_or_else(|| TransportError::protocol("transport is not serving"))?;

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let connection = Arc::new(MemoryConnection {
            outbound: outbound_tx,
            open: AtomicBool::new(true),
            failing: AtomicBool::new(false),
        });
        let session = factory(Arc::clone(&connection) as Arc<dyn Connection>);
        self.sessions.insert(session.id(), Arc::clone(&session));

        Ok(MemoryClient {
            session,
            connection,
            inbox: outbound_rx,
        })
    }

    /// Number of live sessions.
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Drop a session from the broadcast set.
    pub fn evict(&self, id: Uuid) {
        self.sessions.remove(&id);
    }
}

#[async_trait]
impl ServerTransport for MemoryServerTransport {
    async fn serve(&self, factory: SessionFactory) -> Result<(), TransportError> {
        self.factory
            .set(factory)
            .map_err(|_| TransportError::protocol("transport already serving"))
    }

    async fn broadcast(&self, notification: Notification) {
        let sessions: Vec<Arc<dyn SessionHandle>> = self
            .sessions
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        for session in sessions {
            if let Err(err) = session.notify(notification.clone()).await {
                tracing::warn!(
                    session = %session.id(),
                    error = %err,
                    "broadcast delivery failed, skipping session"
                );
            }
        }
    }

    async fn shutdown(&self) {
        self.closing.store(true, Ordering::SeqCst);
        let ids: Vec<Uuid> = self.sessions.iter().map(|entry| *entry.key()).collect();
        for id in ids {
            if let Some((_, session)) = self.sessions.remove(&id) {
                session.close_gracefully().await;
            }
        }
    }
}

/// The client side of an in-memory connection.
pub struct MemoryClient {
    session: Arc<dyn SessionHandle>,
    connection: Arc<MemoryConnection>,
    inbox: mpsc::UnboundedReceiver<Message>,
}

impl MemoryClient {
    /// The id of the session this client is attached to.
    #[must_use]
    pub fn session_id(&self) -> Uuid {
        self.session.id()
    }

    /// The session handle, for driving dispatch directly.
    #[must_use]
    pub fn session(&self) -> Arc<dyn SessionHandle> {
        Arc::clone(&self.session)
    }

    /// Inject an inbound frame, as if the client had written it.
    pub async fn send(&self, message: Message) {
        self.session.accept(message).await;
    }

    /// Next frame the server sent, or `None` once the connection closed.
    pub async fn recv(&mut self) -> Option<Message> {
        self.inbox.recv().await
    }

    /// Next frame, if one is already queued.
    pub fn try_recv(&mut self) -> Option<Message> {
        self.inbox.try_recv().ok()
    }

    /// Make every subsequent server→client delivery fail, to exercise
    /// error isolation.
    pub fn fail_deliveries(&self, failing: bool) {
        self.connection.failing.store(failing, Ordering::SeqCst);
    }
}

struct MemoryConnection {
    outbound: mpsc::UnboundedSender<Message>,
    open: AtomicBool,
    failing: AtomicBool,
}

#[async_trait]
impl Connection for MemoryConnection {
    async fn send(&self, message: Message) -> Result<(), TransportError> {
        if !self.is_open() {
            return Err(TransportError::NotConnected);
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(TransportError::protocol("injected delivery failure"));
        }
        self.outbound
            .send(message)
            .map_err(|_| TransportError::ConnectionClosed)
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
