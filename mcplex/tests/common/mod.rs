//! Shared helpers for the integration suite: a server over the in-memory
//! transport plus a minimal scripted client.
#![allow(dead_code)]

use mcplex::prelude::*;
use std::sync::Arc;

/// Install a tracing subscriber once, honoring `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Connect a built server over a fresh in-memory transport.
pub async fn connect_server(builder: McpServerBuilder) -> (McpServer, Arc<MemoryServerTransport>) {
    init_tracing();
    let transport = Arc::new(MemoryServerTransport::new());
    let server = builder
        .connect(Arc::clone(&transport))
        .await
        .expect("server connects");
    (server, transport)
}

/// A server with the given capabilities and no initial entries.
pub async fn connect_with_capabilities(
    capabilities: ServerCapabilities,
) -> (McpServer, Arc<MemoryServerTransport>) {
    connect_server(McpServer::builder("test-server", "0.1.0").capabilities(capabilities)).await
}

/// Run the handshake for a client, requesting the given version, then
/// confirm with `notifications/initialized`.
pub async fn initialize(client: &mut MemoryClient, version: &str) -> InitializeResult {
    let params = serde_json::json!({
        "protocolVersion": version,
        "capabilities": {"roots": {"listChanged": true}, "sampling": {}},
        "clientInfo": {"name": "test-client", "version": "1.0.0"},
    });
    let response = request(client, 1, "initialize", Some(params)).await;
    let result = response.into_result().expect("initialize succeeds");
    let parsed: InitializeResult =
        serde_json::from_value(result).expect("initialize result parses");
    client
        .send(Message::Notification(Notification::new(
            "notifications/initialized",
        )))
        .await;
    parsed
}

/// Issue a request and wait for its correlated response, skipping any
/// interleaved notifications.
pub async fn request(
    client: &mut MemoryClient,
    id: u64,
    method: &str,
    params: Option<serde_json::Value>,
) -> Response {
    let req = match params {
        Some(params) => Request::with_params(method, id, params),
        None => Request::new(method, id),
    };
    client.send(Message::Request(req)).await;
    loop {
        match client.recv().await.expect("connection stays open") {
            Message::Response(response) if response.id == RequestId::Number(id) => {
                return response;
            }
            Message::Response(other) => panic!("response for unexpected id {:?}", other.id),
            _ => {}
        }
    }
}

/// Drain any notification frames already queued for the client, returning
/// their method names.
pub fn drain_notifications(client: &mut MemoryClient) -> Vec<String> {
    let mut methods = Vec::new();
    while let Some(message) = client.try_recv() {
        if let Message::Notification(notification) = message {
            methods.push(notification.method);
        }
    }
    methods
}
