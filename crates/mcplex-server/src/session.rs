//! Per-connection protocol state machine.
//!
//! A [`Session`] owns everything scoped to one client connection: the
//! handshake data (fixed once negotiated), the minimum logging level, and
//! the table of pending server→client requests. Inbound frames route to
//! the request- or notification-handler table; handler failures become
//! error responses at this boundary and never reach the transport's I/O
//! loop.
//!
//! The lifecycle is monotonic: `CREATED → INITIALIZED → CLOSING → CLOSED`
//! with no regressions. Closing a session fails every outstanding pending
//! request with a session-closed error.

use crate::exchange::ServerExchange;
use async_trait::async_trait;
use dashmap::DashMap;
use futures::future::BoxFuture;
use mcplex_core::capability::{ClientCapabilities, Implementation};
use mcplex_core::jsonrpc::{Message, Notification, Request, RequestId, Response};
use mcplex_core::types::LoggingLevel;
use mcplex_core::McpError;
use mcplex_transport::{Connection, SessionHandle};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, OnceLock, RwLock, Weak};
use std::time::Duration;
use tokio::sync::oneshot;
use uuid::Uuid;

/// Default timeout for server-initiated client calls.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// An installed request handler: takes the exchange and the raw params,
/// produces the result payload.
pub type RequestHandler =
    Arc<dyn Fn(ServerExchange, Option<serde_json::Value>) -> BoxFuture<'static, Result<serde_json::Value, McpError>> + Send + Sync>;

/// An installed notification handler. Fire-and-forget: failures are the
/// handler's to log.
pub type NotificationHandler =
    Arc<dyn Fn(ServerExchange, Option<serde_json::Value>) -> BoxFuture<'static, ()> + Send + Sync>;

/// The request- and notification-handler tables a session dispatches into.
#[derive(Default)]
pub struct HandlerSet {
    /// Request handlers by method name.
    pub requests: HashMap<&'static str, RequestHandler>,
    /// Notification handlers by method name.
    pub notifications: HashMap<&'static str, NotificationHandler>,
}

/// Session lifecycle states, in order. Transitions never regress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum SessionState {
    /// Connection accepted, handshake not yet performed.
    Created = 0,
    /// Handshake complete; normal dispatch.
    Initialized = 1,
    /// Winding down; no new work accepted.
    Closing = 2,
    /// Fully closed.
    Closed = 3,
}

impl SessionState {
    const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Created,
            1 => Self::Initialized,
            2 => Self::Closing,
            _ => Self::Closed,
        }
    }
}

/// Client identity and negotiated version, fixed at handshake.
#[derive(Debug, Clone)]
pub struct Handshake {
    /// The negotiated protocol version.
    pub protocol_version: String,
    /// Who the client is.
    pub client_info: Implementation,
    /// What the client declared it can do.
    pub client_capabilities: ClientCapabilities,
}

/// One connection's protocol state machine.
pub struct Session {
    id: Uuid,
    weak_self: Weak<Session>,
    connection: Arc<dyn Connection>,
    handlers: Arc<HandlerSet>,
    state: AtomicU8,
    handshake: OnceLock<Handshake>,
    min_log_level: RwLock<LoggingLevel>,
    pending: DashMap<u64, oneshot::Sender<Result<serde_json::Value, McpError>>>,
    next_request_id: AtomicU64,
    request_timeout: Duration,
}

impl Session {
    /// Create a session over a connection, dispatching into the given
    /// handler tables.
    #[must_use]
    pub fn new(
        connection: Arc<dyn Connection>,
        handlers: Arc<HandlerSet>,
        request_timeout: Duration,
    ) -> Arc<Self> {
        Arc::new_cyclic(|weak_self| Self {
            id: Uuid::new_v4(),
            weak_self: weak_self.clone(),
            connection,
            handlers,
            state: AtomicU8::new(SessionState::Created as u8),
            handshake: OnceLock::new(),
            min_log_level: RwLock::new(LoggingLevel::default()),
            pending: DashMap::new(),
            next_request_id: AtomicU64::new(1),
            request_timeout,
        })
    }

    /// The session's opaque id.
    #[must_use]
    pub fn session_id(&self) -> Uuid {
        self.id
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        SessionState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Advance the lifecycle. `fetch_max` keeps it monotonic: a session
    /// can never regress from CLOSED.
    fn advance(&self, target: SessionState) {
        self.state.fetch_max(target as u8, Ordering::SeqCst);
    }

    /// Handshake data, once `initialize` has run.
    #[must_use]
    pub fn handshake(&self) -> Option<&Handshake> {
        self.handshake.get()
    }

    /// Record the handshake outcome. Fails on a second `initialize`.
    pub fn record_handshake(&self, handshake: Handshake) -> Result<(), McpError> {
        self.handshake
            .set(handshake)
            .map_err(|_| McpError::invalid_request("session already initialized"))?;
        self.advance(SessionState::Initialized);
        Ok(())
    }

    /// The session's minimum logging level.
    #[must_use]
    pub fn min_log_level(&self) -> LoggingLevel {
        self.min_log_level
            .read()
            .map(|level| *level)
            .unwrap_or_default()
    }

    /// Update the minimum logging level (`logging/setLevel`).
    pub fn set_min_log_level(&self, level: LoggingLevel) {
        if let Ok(mut guard) = self.min_log_level.write() {
            *guard = level;
        }
    }

    /// Whether a message at `level` passes the session's logging gate.
    #[must_use]
    pub fn should_log(&self, level: LoggingLevel) -> bool {
        level >= self.min_log_level()
    }

    /// Number of outstanding server→client requests.
    #[must_use]
    pub fn pending_requests(&self) -> usize {
        self.pending.len()
    }

    /// Issue a server→client request and await its correlated response.
    ///
    /// A fresh correlation id is generated per call and never reused
    /// while live. The call fails with a timeout error when no response
    /// arrives within the session's request timeout, and with
    /// [`McpError::SessionClosed`] when the session closes first.
    pub async fn send_request<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<T, McpError> {
        if self.state() >= SessionState::Closing {
            return Err(McpError::SessionClosed);
        }

        let id = self.next_request_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.pending.insert(id, tx);

        let request = Request {
            jsonrpc: mcplex_core::jsonrpc::JSONRPC_VERSION.to_owned(),
            id: RequestId::Number(id),
            method: method.to_owned(),
            params,
        };
        if let Err(err) = self.connection.send(Message::Request(request)).await {
            self.pending.remove(&id);
            return Err(err.into());
        }

        match tokio::time::timeout(self.request_timeout, rx).await {
            Ok(Ok(result)) => {
                let value = result?;
                serde_json::from_value(value).map_err(McpError::from)
            }
            // Resolution slot dropped: the session closed underneath us.
            Ok(Err(_)) => Err(McpError::SessionClosed),
            Err(_) => {
                self.pending.remove(&id);
                Err(McpError::timeout(method, self.request_timeout))
            }
        }
    }

    /// Send a notification to this session's client.
    pub async fn send_notification(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<(), McpError> {
        if self.state() >= SessionState::Closing {
            return Err(McpError::SessionClosed);
        }
        let notification = match params {
            Some(params) => Notification::with_params(method, params),
            None => Notification::new(method),
        };
        self.connection
            .send(Message::Notification(notification))
            .await
            .map_err(Into::into)
    }

    async fn dispatch_request(&self, request: Request) {
        let method = request.method.clone();
        let id = request.id.clone();
        tracing::debug!(session = %self.id, method = %method, id = %id, "dispatching request");

        let result = self.run_request_handler(request).await;
        let response = match result {
            Ok(value) => Response::success(id, value),
            Err(err) => {
                if !err.is_not_found() {
                    tracing::debug!(session = %self.id, method = %method, error = %err, "request handler failed");
                }
                Response::failure(id, err.to_error_data())
            }
        };
        if let Err(err) = self.connection.send(Message::Response(response)).await {
            tracing::warn!(session = %self.id, error = %err, "failed to deliver response");
        }
    }

    async fn run_request_handler(
        &self,
        request: Request,
    ) -> Result<serde_json::Value, McpError> {
        if self.state() >= SessionState::Closing {
            return Err(McpError::SessionClosed);
        }

        let method = request.method.as_str();
        let handler = self
            .handlers
            .requests
            .get(method)
            .cloned()
            .ok_or_else(|| McpError::method_not_found(method))?;

        // Until the handshake has run, only initialize and ping may pass.
        if self.handshake.get().is_none()
            && method != mcplex_core::methods::INITIALIZE
            && method != mcplex_core::methods::PING
        {
            return Err(McpError::invalid_request("server not initialized"));
        }

        let exchange = self.exchange()?;
        handler(exchange, request.params).await
    }

    async fn dispatch_notification(&self, notification: Notification) {
        let method = notification.method.as_str();
        let Some(handler) = self.handlers.notifications.get(method).cloned() else {
            tracing::debug!(session = %self.id, method = %method, "ignoring unknown notification");
            return;
        };
        let Ok(exchange) = self.exchange() else {
            return;
        };
        handler(exchange, notification.params).await;
    }

    /// Resolve a response against the pending table. A response can only
    /// resolve a request this session itself issued; anything else is
    /// logged and dropped.
    fn resolve_response(&self, response: Response) {
        let id = match &response.id {
            RequestId::Number(id) => *id,
            RequestId::String(id) => {
                tracing::warn!(session = %self.id, id = %id, "response id was never issued here");
                return;
            }
        };
        let Some((_, slot)) = self.pending.remove(&id) else {
            tracing::warn!(session = %self.id, id, "response for unknown or expired request");
            return;
        };
        let payload = match (response.result, response.error) {
            (_, Some(error)) => Err(McpError::from(error)),
            (Some(result), None) => Ok(result),
            (None, None) => Err(McpError::internal(
                "response carried neither result nor error",
            )),
        };
        let _ = slot.send(payload);
    }

    fn fail_pending(&self) {
        let ids: Vec<u64> = self.pending.iter().map(|entry| *entry.key()).collect();
        for id in ids {
            if let Some((_, slot)) = self.pending.remove(&id) {
                let _ = slot.send(Err(McpError::SessionClosed));
            }
        }
    }

    fn exchange(&self) -> Result<ServerExchange, McpError> {
        self.weak_self
            .upgrade()
            .map(ServerExchange::new)
            .ok_or_else(|| McpError::internal("session dropped mid-dispatch"))
    }
}

#[async_trait]
impl SessionHandle for Session {
    fn id(&self) -> Uuid {
        self.id
    }

    async fn accept(&self, message: Message) {
        match message {
            Message::Request(request) => self.dispatch_request(request).await,
            Message::Notification(notification) => self.dispatch_notification(notification).await,
            Message::Response(response) => self.resolve_response(response),
        }
    }

    async fn notify(&self, notification: Notification) -> Result<(), McpError> {
        if self.state() >= SessionState::Closing {
            return Err(McpError::SessionClosed);
        }
        self.connection
            .send(Message::Notification(notification))
            .await
            .map_err(Into::into)
    }

    async fn close_gracefully(&self) {
        self.advance(SessionState::Closing);
        self.fail_pending();
        if let Err(err) = self.connection.close_gracefully().await {
            tracing::debug!(session = %self.id, error = %err, "graceful close reported an error");
        }
        self.advance(SessionState::Closed);
    }

    fn close(&self) {
        self.advance(SessionState::Closed);
        self.fail_pending();
        self.connection.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcplex_transport::TransportError;
    use std::sync::atomic::AtomicBool;
    use std::sync::Mutex;

    /// A connection that records everything sent through it.
    struct RecordingConnection {
        sent: Mutex<Vec<Message>>,
        open: AtomicBool,
    }

    impl RecordingConnection {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                sent: Mutex::new(Vec::new()),
                open: AtomicBool::new(true),
            })
        }

        fn sent(&self) -> Vec<Message> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Connection for RecordingConnection {
        async fn send(&self, message: Message) -> Result<(), TransportError> {
            if !self.is_open() {
                return Err(TransportError::NotConnected);
            }
            self.sent.lock().unwrap().push(message);
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

    fn handlers_with_echo() -> Arc<HandlerSet> {
        let mut handlers = HandlerSet::default();
        handlers.requests.insert(
            mcplex_core::methods::PING,
            Arc::new(|_, _| Box::pin(async { Ok(serde_json::json!({})) })),
        );
        Arc::new(handlers)
    }

    fn test_session(connection: Arc<RecordingConnection>) -> Arc<Session> {
        Session::new(connection, handlers_with_echo(), Duration::from_millis(200))
    }

    fn initialized(session: &Session) {
        session
            .record_handshake(Handshake {
                protocol_version: "2025-03-26".to_owned(),
                client_info: Implementation::new("test-client", "1.0.0"),
                client_capabilities: ClientCapabilities::default(),
            })
            .unwrap();
    }

    #[test]
    fn lifecycle_is_monotonic() {
        let session = test_session(RecordingConnection::new());
        assert_eq!(session.state(), SessionState::Created);

        session.advance(SessionState::Closed);
        session.advance(SessionState::Initialized);
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[test]
    fn handshake_is_recorded_once() {
        let session = test_session(RecordingConnection::new());
        initialized(&session);
        assert_eq!(session.state(), SessionState::Initialized);
        assert_eq!(
            session.handshake().unwrap().client_info.name,
            "test-client"
        );

        let second = session.record_handshake(Handshake {
            protocol_version: "2024-11-05".to_owned(),
            client_info: Implementation::new("other", "2.0.0"),
            client_capabilities: ClientCapabilities::default(),
        });
        assert!(second.is_err());
        // First handshake untouched
        assert_eq!(
            session.handshake().unwrap().protocol_version,
            "2025-03-26"
        );
    }

    #[tokio::test]
    async fn requests_before_handshake_are_rejected() {
        let connection = RecordingConnection::new();
        let mut handlers = HandlerSet::default();
        handlers.requests.insert(
            "tools/list",
            Arc::new(|_, _| Box::pin(async { Ok(serde_json::json!({"tools": []})) })),
        );
        let session = Session::new(
            Arc::clone(&connection) as Arc<dyn Connection>,
            Arc::new(handlers),
            Duration::from_millis(200),
        );

        session
            .accept(Message::Request(Request::new("tools/list", 1u64)))
            .await;

        let sent = connection.sent();
        let Message::Response(response) = sent.last().unwrap() else {
            panic!("expected a response");
        };
        assert!(response.is_error());
    }

    #[tokio::test]
    async fn unknown_method_yields_method_not_found() {
        let connection = RecordingConnection::new();
        let session = test_session(Arc::clone(&connection));
        initialized(&session);

        session
            .accept(Message::Request(Request::new("no/such/method", 5u64)))
            .await;

        let sent = connection.sent();
        let Message::Response(response) = sent.last().unwrap() else {
            panic!("expected a response");
        };
        let err = response.clone().into_result().unwrap_err();
        assert_eq!(err.code.value(), -32601);
    }

    #[tokio::test]
    async fn pending_request_times_out_and_cleans_up() {
        let connection = RecordingConnection::new();
        let session = test_session(Arc::clone(&connection));
        initialized(&session);

        let result: Result<serde_json::Value, _> =
            session.send_request("roots/list", None).await;
        assert!(matches!(result, Err(McpError::Timeout { .. })));
        assert_eq!(session.pending_requests(), 0);
    }

    #[tokio::test]
    async fn response_resolves_pending_request() {
        let connection = RecordingConnection::new();
        let session = test_session(Arc::clone(&connection));
        initialized(&session);

        let session_for_request = Arc::clone(&session);
        let request = tokio::spawn(async move {
            session_for_request
                .send_request::<serde_json::Value>("roots/list", None)
                .await
        });

        // Wait for the outbound request frame to learn its id.
        let id = loop {
            let maybe = connection.sent().into_iter().find_map(|m| match m {
                Message::Request(req) => Some(req.id),
                _ => None,
            });
            if let Some(id) = maybe {
                break id;
            }
            tokio::task::yield_now().await;
        };

        session
            .accept(Message::Response(Response::success(
                id,
                serde_json::json!({"roots": []}),
            )))
            .await;

        let value = request.await.unwrap().unwrap();
        assert!(value["roots"].is_array());
    }

    #[tokio::test]
    async fn stray_response_is_dropped() {
        let connection = RecordingConnection::new();
        let session = test_session(Arc::clone(&connection));
        initialized(&session);

        // No pending request with this id; must not panic or send anything.
        session
            .accept(Message::Response(Response::success(
                RequestId::Number(999),
                serde_json::json!({}),
            )))
            .await;
        assert!(connection.sent().is_empty());
    }

    #[tokio::test]
    async fn close_fails_outstanding_requests() {
        let connection = RecordingConnection::new();
        let session = test_session(Arc::clone(&connection));
        initialized(&session);

        let session_for_request = Arc::clone(&session);
        let request = tokio::spawn(async move {
            session_for_request
                .send_request::<serde_json::Value>("roots/list", None)
                .await
        });
        // Let the request register itself.
        while session.pending_requests() == 0 {
            tokio::task::yield_now().await;
        }

        session.close_gracefully().await;
        let result = request.await.unwrap();
        assert!(matches!(result, Err(McpError::SessionClosed)));
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[tokio::test]
    async fn logging_gate_follows_min_level() {
        let session = test_session(RecordingConnection::new());
        assert!(session.should_log(LoggingLevel::Info));
        assert!(!session.should_log(LoggingLevel::Debug));

        session.set_min_log_level(LoggingLevel::Error);
        assert!(!session.should_log(LoggingLevel::Warning));
        assert!(session.should_log(LoggingLevel::Critical));
    }

    #[tokio::test]
    async fn send_request_after_close_is_rejected() {
        let session = test_session(RecordingConnection::new());
        initialized(&session);
        session.close();

        let result: Result<serde_json::Value, _> =
            session.send_request("roots/list", None).await;
        assert!(matches!(result, Err(McpError::SessionClosed)));
    }
}
