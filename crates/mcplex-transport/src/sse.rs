//! HTTP transport with a server-sent-events stream (feature `http`).
//!
//! Two endpoints implement the contract:
//!
//! - `GET /sse` opens a persistent server→client event stream. The first
//!   event is named `endpoint` and carries the URL (with session id) the
//!   client must POST its messages to.
//! - `POST /message?sessionId=<id>` accepts client→server frames for an
//!   existing session.
//!
//! Unknown session id → 404, missing session id → 400, server shutting
//! down → 503.

use crate::error::TransportError;
use crate::traits::{Connection, ServerTransport, SessionFactory, SessionHandle};
use async_trait::async_trait;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::{get, post};
use axum::Router;
use dashmap::DashMap;
use futures::Stream;
use mcplex_core::jsonrpc::{Message, Notification};
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Path of the event-stream endpoint.
pub const SSE_PATH: &str = "/sse";
/// Path of the message-ingress endpoint.
pub const MESSAGE_PATH: &str = "/message";

/// Per-session outbound queue depth.
const SESSION_QUEUE_CAPACITY: usize = 64;

/// A server transport speaking HTTP POST plus an SSE event stream.
#[derive(Default)]
pub struct SseServerTransport {
    state: Arc<SseState>,
}

#[derive(Default)]
struct SseState {
    factory: OnceLock<SessionFactory>,
    sessions: DashMap<Uuid, Arc<dyn SessionHandle>>,
    closing: AtomicBool,
}

impl SseServerTransport {
    /// Create an idle transport; call [`ServerTransport::serve`] before
    /// mounting the router.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The axum router exposing the two protocol endpoints.
    #[must_use]
    pub fn router(&self) -> Router {
        Router::new()
            .route(SSE_PATH, get(open_event_stream))
            .route(MESSAGE_PATH, post(accept_message))
            .with_state(Arc::clone(&self.state))
    }

    /// Number of live sessions.
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.state.sessions.len()
    }
}

#[async_trait]
impl ServerTransport for SseServerTransport {
    async fn serve(&self, factory: SessionFactory) -> Result<(), TransportError> {
        self.state
            .factory
            .set(factory)
            .map_err(|_| TransportError::protocol("transport already serving"))
    }

    async fn broadcast(&self, notification: Notification) {
        let sessions: Vec<Arc<dyn SessionHandle>> = self
            .state
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
        self.state.closing.store(true, Ordering::SeqCst);
        let ids: Vec<Uuid> = self.state.sessions.iter().map(|e| *e.key()).collect();
        for id in ids {
            if let Some((_, session)) = self.state.sessions.remove(&id) {
                session.close_gracefully().await;
            }
        }
    }
}

/// Register a new session and hand back its outbound queue.
fn create_session(
    state: &Arc<SseState>,
) -> Result<(Uuid, mpsc::Receiver<Message>), StatusCode> {
    if state.closing.load(Ordering::SeqCst) {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }
    let factory = state
        .factory
        .get()
        .ok_or(StatusCode::SERVICE_UNAVAILABLE)?;

    let (outbound_tx, outbound_rx) = mpsc::channel(SESSION_QUEUE_CAPACITY);
    let connection = Arc::new(SseConnection {
        outbound: outbound_tx,
        open: AtomicBool::new(true),
    });
    let session = factory(connection);
    let id = session.id();
    state.sessions.insert(id, session);
    tracing::debug!(session = %id, "sse session opened");
    Ok((id, outbound_rx))
}

fn endpoint_for(id: Uuid) -> String {
    format!("{MESSAGE_PATH}?sessionId={id}")
}

async fn open_event_stream(
    State(state): State<Arc<SseState>>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, StatusCode> {
    let (id, mut outbound_rx) = create_session(&state)?;
    let endpoint = endpoint_for(id);

    let stream = async_stream::stream! {
        yield Ok::<Event, Infallible>(Event::default().event("endpoint").data(endpoint));
        while let Some(message) = outbound_rx.recv().await {
            match Event::default().event("message").json_data(&message) {
                Ok(event) => yield Ok(event),
                Err(err) => {
                    tracing::error!(session = %id, error = %err, "failed to encode outbound frame");
                }
            }
        }
        state.sessions.remove(&id);
        tracing::debug!(session = %id, "sse session stream ended");
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

async fn accept_message(
    State(state): State<Arc<SseState>>,
    Query(params): Query<HashMap<String, String>>,
    body: String,
) -> StatusCode {
    if state.closing.load(Ordering::SeqCst) {
        return StatusCode::SERVICE_UNAVAILABLE;
    }
    let Some(raw_id) = params.get("sessionId") else {
        return StatusCode::BAD_REQUEST;
    };
    let Ok(id) = Uuid::parse_str(raw_id) else {
        return StatusCode::NOT_FOUND;
    };
    let Some(entry) = state.sessions.get(&id) else {
        return StatusCode::NOT_FOUND;
    };
    let session = Arc::clone(entry.value());
    drop(entry);

    let message: Message = match serde_json::from_str(&body) {
        Ok(message) => message,
        Err(err) => {
            tracing::debug!(session = %id, error = %err, "rejecting undecodable POST body");
            return StatusCode::BAD_REQUEST;
        }
    };

    // Dispatch off the HTTP worker so a slow handler never holds the
    // connection open.
    tokio::spawn(async move { session.accept(message).await });
    StatusCode::ACCEPTED
}

struct SseConnection {
    outbound: mpsc::Sender<Message>,
    open: AtomicBool,
}

#[async_trait]
impl Connection for SseConnection {
    async fn send(&self, message: Message) -> Result<(), TransportError> {
        if !self.is_open() {
            return Err(TransportError::NotConnected);
        }
        self.outbound
            .send(message)
            .await
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

#[cfg(test)]
mod tests {
    use super::*;
    use mcplex_core::jsonrpc::Request;
    use mcplex_core::McpError;

    struct SinkSession {
        id: Uuid,
        connection: Arc<dyn Connection>,
        accepted: Arc<std::sync::atomic::AtomicUsize>,
    }

    #[async_trait]
    impl SessionHandle for SinkSession {
        fn id(&self) -> Uuid {
            self.id
        }

        async fn accept(&self, _message: Message) {
            self.accepted.fetch_add(1, Ordering::SeqCst);
        }

        async fn notify(&self, notification: Notification) -> Result<(), McpError> {
            self.connection
                .send(Message::Notification(notification))
                .await
                .map_err(Into::into)
        }

        async fn close_gracefully(&self) {
            let _ = self.connection.close_gracefully().await;
        }

        fn close(&self) {
            self.connection.close();
        }
    }

    fn sink_factory(accepted: Arc<std::sync::atomic::AtomicUsize>) -> SessionFactory {
        Arc::new(move |connection| {
            Arc::new(SinkSession {
                id: Uuid::new_v4(),
                connection,
                accepted: Arc::clone(&accepted),
            }) as Arc<dyn SessionHandle>
        })
    }

    fn counter() -> Arc<std::sync::atomic::AtomicUsize> {
        Arc::new(std::sync::atomic::AtomicUsize::new(0))
    }

    #[tokio::test]
    async fn missing_session_id_is_bad_request() {
        let transport = SseServerTransport::new();
        transport.serve(sink_factory(counter())).await.unwrap();

        let status = accept_message(
            State(Arc::clone(&transport.state)),
            Query(HashMap::new()),
            "{}".to_owned(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_session_id_is_not_found() {
        let transport = SseServerTransport::new();
        transport.serve(sink_factory(counter())).await.unwrap();

        let mut params = HashMap::new();
        params.insert("sessionId".to_owned(), Uuid::new_v4().to_string());
        let status = accept_message(
            State(Arc::clone(&transport.state)),
            Query(params),
            "{}".to_owned(),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn shutdown_rejects_posts_with_unavailable() {
        let transport = SseServerTransport::new();
        transport.serve(sink_factory(counter())).await.unwrap();
        transport.shutdown().await;

        let status = accept_message(
            State(Arc::clone(&transport.state)),
            Query(HashMap::new()),
            "{}".to_owned(),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn posted_frames_reach_the_session() {
        let accepted = counter();
        let transport = SseServerTransport::new();
        transport.serve(sink_factory(Arc::clone(&accepted))).await.unwrap();

        let (id, _outbound) = create_session(&transport.state).unwrap();
        let frame =
            serde_json::to_string(&Message::Request(Request::new("ping", 1u64))).unwrap();

        let mut params = HashMap::new();
        params.insert("sessionId".to_owned(), id.to_string());
        let status = accept_message(
            State(Arc::clone(&transport.state)),
            Query(params),
            frame,
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);

        // accept() runs on a spawned task
        for _ in 0..100 {
            if accepted.load(Ordering::SeqCst) == 1 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(accepted.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn endpoint_carries_session_id_query() {
        let id = Uuid::new_v4();
        let endpoint = endpoint_for(id);
        assert!(endpoint.starts_with("/message?sessionId="));
        assert!(endpoint.ends_with(&id.to_string()));
    }
}
