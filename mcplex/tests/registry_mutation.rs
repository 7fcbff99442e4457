//! Dynamic registry mutation: uniqueness, capability gating, and change
//! notifications.

mod common;

use common::{connect_server, connect_with_capabilities, drain_notifications, initialize, request};
use mcplex::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn counting_tool(name: &str, marker: &'static str, calls: Arc<AtomicUsize>) -> ToolSpec {
    ToolSpec::new(Tool::new(name), move |_exchange, _args| {
        let calls = Arc::clone(&calls);
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(CallToolResult::text(marker))
        }
    })
    .unwrap()
}

fn named_tool(name: &str) -> ToolSpec {
    ToolSpec::new(Tool::new(name), |_exchange, _args| async {
        Ok(CallToolResult::text("ok"))
    })
    .unwrap()
}

async fn listed_tools(client: &mut MemoryClient, id: u64) -> Vec<String> {
    let response = request(client, id, "tools/list", None).await;
    let result: ListToolsResult =
        serde_json::from_value(response.into_result().unwrap()).unwrap();
    result.tools.into_iter().map(|tool| tool.name).collect()
}

#[tokio::test]
async fn list_reflects_surviving_set_after_add_remove_sequence() {
    let (server, transport) =
        connect_with_capabilities(ServerCapabilities::new().with_tools(false)).await;
    let mut client = transport.connect().unwrap();
    initialize(&mut client, "2025-03-26").await;

    server.add_tool(named_tool("alpha")).await.unwrap();
    server.add_tool(named_tool("beta")).await.unwrap();
    server.add_tool(named_tool("gamma")).await.unwrap();
    server.remove_tool("beta").await.unwrap();
    server.add_tool(named_tool("delta")).await.unwrap();
    server.remove_tool("alpha").await.unwrap();

    let names = listed_tools(&mut client, 10).await;
    assert_eq!(names, ["delta", "gamma"]);
}

#[tokio::test]
async fn duplicate_registration_fails_without_mutating_state() {
    let first_calls = Arc::new(AtomicUsize::new(0));
    let second_calls = Arc::new(AtomicUsize::new(0));

    let (server, transport) =
        connect_with_capabilities(ServerCapabilities::new().with_tools(false)).await;
    let mut client = transport.connect().unwrap();
    initialize(&mut client, "2025-03-26").await;

    server
        .add_tool(counting_tool("echo", "first", Arc::clone(&first_calls)))
        .await
        .unwrap();
    let duplicate = server
        .add_tool(counting_tool("echo", "second", Arc::clone(&second_calls)))
        .await;
    assert!(matches!(duplicate, Err(McpError::AlreadyRegistered { .. })));

    // The registry still holds the first handler.
    let response = request(
        &mut client,
        10,
        "tools/call",
        Some(serde_json::json!({"name": "echo", "arguments": {}})),
    )
    .await;
    let result: CallToolResult =
        serde_json::from_value(response.into_result().unwrap()).unwrap();
    assert_eq!(result.content[0].as_text(), Some("first"));
    assert_eq!(first_calls.load(Ordering::SeqCst), 1);
    assert_eq!(second_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn removing_an_absent_entry_fails() {
    let (server, _transport) =
        connect_with_capabilities(ServerCapabilities::new().with_tools(false)).await;
    let result = server.remove_tool("ghost").await;
    assert!(matches!(result, Err(McpError::ToolNotFound { .. })));
}

#[tokio::test]
async fn mutation_against_undeclared_capability_is_rejected() {
    let (server, _transport) =
        connect_with_capabilities(ServerCapabilities::new().with_prompts(false)).await;

    let result = server.add_tool(named_tool("echo")).await;
    assert!(matches!(
        result,
        Err(McpError::CapabilityNotDeclared { .. })
    ));
    let result = server.remove_tool("echo").await;
    assert!(matches!(
        result,
        Err(McpError::CapabilityNotDeclared { .. })
    ));
}

#[tokio::test]
async fn list_changed_true_broadcasts_on_add_and_remove() {
    let (server, transport) =
        connect_with_capabilities(ServerCapabilities::new().with_tools(true)).await;
    let mut client = transport.connect().unwrap();
    initialize(&mut client, "2025-03-26").await;

    server.add_tool(named_tool("alpha")).await.unwrap();
    server.remove_tool("alpha").await.unwrap();

    let methods = drain_notifications(&mut client);
    assert_eq!(
        methods,
        [
            "notifications/tools/list_changed",
            "notifications/tools/list_changed"
        ]
    );
}

#[tokio::test]
async fn list_changed_false_never_broadcasts() {
    let (server, transport) =
        connect_with_capabilities(ServerCapabilities::new().with_tools(false)).await;
    let mut client = transport.connect().unwrap();
    initialize(&mut client, "2025-03-26").await;

    server.add_tool(named_tool("alpha")).await.unwrap();
    server.remove_tool("alpha").await.unwrap();

    assert!(drain_notifications(&mut client).is_empty());
}

#[tokio::test]
async fn capability_growth_after_handshake_is_permitted() {
    // The handshake advertises a fixed capability set; later mutation is
    // deliberately not re-validated against what the client saw.
    let (server, transport) =
        connect_with_capabilities(ServerCapabilities::new().with_tools(true)).await;
    let mut client = transport.connect().unwrap();

    initialize(&mut client, "2025-03-26").await;
    assert!(listed_tools(&mut client, 10).await.is_empty());

    server.add_tool(named_tool("late-arrival")).await.unwrap();

    assert_eq!(
        drain_notifications(&mut client),
        ["notifications/tools/list_changed"]
    );
    assert_eq!(listed_tools(&mut client, 11).await, ["late-arrival"]);
}

#[tokio::test]
async fn prompts_and_resources_follow_the_same_mutation_contract() {
    let (server, transport) = connect_server(
        McpServer::builder("test-server", "0.1.0").capabilities(
            ServerCapabilities::new()
                .with_prompts(true)
                .with_resources(true),
        ),
    )
    .await;
    let mut client = transport.connect().unwrap();
    initialize(&mut client, "2025-03-26").await;

    let prompt = PromptSpec::new(Prompt::new("review"), |_exchange, _request| async {
        Ok(GetPromptResult {
            description: None,
            messages: vec![PromptMessage::text(Role::User, "review this")],
        })
    })
    .unwrap();
    server.add_prompt(prompt).await.unwrap();

    let resource = ResourceSpec::new(
        Resource::new("config://app", "Config"),
        |_exchange, request| async move {
            Ok(ReadResourceResult {
                contents: vec![ResourceContents::text(request.uri, "{}")],
            })
        },
    )
    .unwrap();
    server.add_resource(resource).await.unwrap();

    let methods = drain_notifications(&mut client);
    assert_eq!(
        methods,
        [
            "notifications/prompts/list_changed",
            "notifications/resources/list_changed"
        ]
    );

    server.remove_prompt("review").await.unwrap();
    server.remove_resource("config://app").await.unwrap();
    assert!(matches!(
        server.remove_prompt("review").await,
        Err(McpError::PromptNotFound { .. })
    ));
    assert!(matches!(
        server.remove_resource("config://app").await,
        Err(McpError::ResourceNotFound { .. })
    ));
}
