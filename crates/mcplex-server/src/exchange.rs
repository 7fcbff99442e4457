//! The exchange handle passed to every handler.
//!
//! A [`ServerExchange`] is a handler's view of the session it is serving:
//! who the client is, what it can do, and the two server→client calls the
//! protocol permits (listing roots, requesting a model sampling). It also
//! carries the per-session logging gate.

use crate::session::Session;
use mcplex_core::capability::{ClientCapabilities, Implementation};
use mcplex_core::methods;
use mcplex_core::types::{
    CreateMessageRequest, CreateMessageResult, ListRootsResult, LoggingMessageNotification,
};
use mcplex_core::McpError;
use std::sync::Arc;
use uuid::Uuid;

/// A handler's view of the session it is serving.
#[derive(Clone)]
pub struct ServerExchange {
    session: Arc<Session>,
}

impl ServerExchange {
    pub(crate) fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    /// The id of the underlying session.
    #[must_use]
    pub fn session_id(&self) -> Uuid {
        self.session.session_id()
    }

    /// The underlying session.
    #[must_use]
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// The client's identity, once the handshake has run.
    #[must_use]
    pub fn client_info(&self) -> Option<Implementation> {
        self.session
            .handshake()
            .map(|handshake| handshake.client_info.clone())
    }

    /// The client's declared capabilities, once the handshake has run.
    #[must_use]
    pub fn client_capabilities(&self) -> Option<ClientCapabilities> {
        self.session
            .handshake()
            .map(|handshake| handshake.client_capabilities.clone())
    }

    /// The negotiated protocol version, once the handshake has run.
    #[must_use]
    pub fn protocol_version(&self) -> Option<String> {
        self.session
            .handshake()
            .map(|handshake| handshake.protocol_version.clone())
    }

    /// Ask the client for its workspace roots.
    pub async fn list_roots(&self) -> Result<ListRootsResult, McpError> {
        self.session.send_request(methods::ROOTS_LIST, None).await
    }

    /// Ask the client to run a model generation on the server's behalf.
    ///
    /// Fails up front when the client never declared the sampling
    /// capability.
    pub async fn create_message(
        &self,
        request: CreateMessageRequest,
    ) -> Result<CreateMessageResult, McpError> {
        if let Some(caps) = self.client_capabilities() {
            if !caps.has_sampling() {
                return Err(McpError::capability_not_declared("sampling"));
            }
        }
        self.session
            .send_request(
                methods::SAMPLING_CREATE_MESSAGE,
                Some(serde_json::to_value(request)?),
            )
            .await
    }

    /// Send a log message to the client.
    ///
    /// Suppressed without error when the message's level is below the
    /// session's current minimum.
    pub async fn log(&self, message: LoggingMessageNotification) -> Result<(), McpError> {
        if !self.session.should_log(message.level) {
            return Ok(());
        }
        self.session
            .send_notification(
                methods::NOTIFICATION_MESSAGE,
                Some(serde_json::to_value(message)?),
            )
            .await
    }
}

impl std::fmt::Debug for ServerExchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerExchange")
            .field("session_id", &self.session_id())
            .field("client_info", &self.client_info())
            .finish_non_exhaustive()
    }
}
