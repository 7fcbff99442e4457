//! Blocking facade over the async dispatcher.
//!
//! [`SyncMcpServer`] wraps exactly one [`McpServer`]. Every public
//! operation invokes the async counterpart and blocks the calling thread
//! until it resolves.
//!
//! The one correctness-critical rule: a synchronous handler registered
//! through this facade never executes on the shared transport dispatch
//! path. It is marshalled onto the runtime's bounded blocking pool
//! (`spawn_blocking`) first, and only that worker's result is fed back
//! into the async pipeline. A sync handler that blocked the dispatch path
//! directly would stall every concurrent session sharing the transport.

use crate::exchange::ServerExchange;
use crate::server::{McpServer, RootsChangeListener};
use crate::spec::{CompletionSpec, PromptSpec, ResourceSpec, ResourceTemplateSpec, ToolSpec};
use mcplex_core::capability::{ClientCapabilities, Implementation};
use mcplex_core::types::{
    CallToolResult, CompleteRequest, CompleteResult, CompletionReference, CreateMessageRequest,
    CreateMessageResult, GetPromptRequest, GetPromptResult, ListRootsResult,
    LoggingMessageNotification, Prompt, ReadResourceRequest, ReadResourceResult, Resource, Tool,
};
use mcplex_core::McpError;
use std::sync::Arc;
use tokio::runtime::Handle;
use uuid::Uuid;

/// Blocking counterpart of [`ServerExchange`], handed to sync handlers.
#[derive(Clone)]
pub struct SyncServerExchange {
    inner: ServerExchange,
    handle: Handle,
}

impl SyncServerExchange {
    fn new(inner: ServerExchange, handle: Handle) -> Self {
        Self { inner, handle }
    }

    /// The id of the underlying session.
    #[must_use]
    pub fn session_id(&self) -> Uuid {
        self.inner.session_id()
    }

    /// The client's identity, once the handshake has run.
    #[must_use]
    pub fn client_info(&self) -> Option<Implementation> {
        self.inner.client_info()
    }

    /// The client's declared capabilities, once the handshake has run.
    #[must_use]
    pub fn client_capabilities(&self) -> Option<ClientCapabilities> {
        self.inner.client_capabilities()
    }

    /// Ask the client for its workspace roots, blocking until it answers.
    pub fn list_roots(&self) -> Result<ListRootsResult, McpError> {
        self.handle.block_on(self.inner.list_roots())
    }

    /// Ask the client for a model generation, blocking until it answers.
    pub fn create_message(
        &self,
        request: CreateMessageRequest,
    ) -> Result<CreateMessageResult, McpError> {
        self.handle.block_on(self.inner.create_message(request))
    }

    /// Send a log message through the session's logging gate.
    pub fn log(&self, message: LoggingMessageNotification) -> Result<(), McpError> {
        self.handle.block_on(self.inner.log(message))
    }
}

/// A tool backed by a synchronous handler.
pub struct SyncToolSpec {
    tool: Tool,
    handler: Arc<
        dyn Fn(&SyncServerExchange, serde_json::Value) -> Result<CallToolResult, McpError>
            + Send
            + Sync,
    >,
}

impl SyncToolSpec {
    /// Create a sync tool spec. Fails on a blank tool name.
    pub fn new<F>(tool: Tool, handler: F) -> Result<Self, McpError>
    where
        F: Fn(&SyncServerExchange, serde_json::Value) -> Result<CallToolResult, McpError>
            + Send
            + Sync
            + 'static,
    {
        if tool.name.trim().is_empty() {
            return Err(McpError::validation("tool name must not be blank"));
        }
        Ok(Self {
            tool,
            handler: Arc::new(handler),
        })
    }

    fn into_async(self, handle: Handle) -> Result<ToolSpec, McpError> {
        let Self { tool, handler } = self;
        ToolSpec::new(tool, move |exchange, arguments| {
            let handler = Arc::clone(&handler);
            let handle = handle.clone();
            async move {
                let sync_exchange = SyncServerExchange::new(exchange, handle.clone());
                handle
                    .spawn_blocking(move || handler(&sync_exchange, arguments))
                    .await
                    .map_err(|err| McpError::internal(format!("sync handler aborted: {err}")))?
            }
        })
    }
}

/// A resource backed by a synchronous read handler.
pub struct SyncResourceSpec {
    resource: Resource,
    handler: Arc<
        dyn Fn(&SyncServerExchange, ReadResourceRequest) -> Result<ReadResourceResult, McpError>
            + Send
            + Sync,
    >,
}

impl SyncResourceSpec {
    /// Create a sync resource spec. Fails on a blank URI or name.
    pub fn new<F>(resource: Resource, handler: F) -> Result<Self, McpError>
    where
        F: Fn(&SyncServerExchange, ReadResourceRequest) -> Result<ReadResourceResult, McpError>
            + Send
            + Sync
            + 'static,
    {
        if resource.uri.trim().is_empty() {
            return Err(McpError::validation("resource uri must not be blank"));
        }
        if resource.name.trim().is_empty() {
            return Err(McpError::validation("resource name must not be blank"));
        }
        Ok(Self {
            resource,
            handler: Arc::new(handler),
        })
    }

    fn into_async(self, handle: Handle) -> Result<ResourceSpec, McpError> {
        let Self { resource, handler } = self;
        ResourceSpec::new(resource, move |exchange, request| {
            let handler = Arc::clone(&handler);
            let handle = handle.clone();
            async move {
                let sync_exchange = SyncServerExchange::new(exchange, handle.clone());
                handle
                    .spawn_blocking(move || handler(&sync_exchange, request))
                    .await
                    .map_err(|err| McpError::internal(format!("sync handler aborted: {err}")))?
            }
        })
    }
}

/// A prompt backed by a synchronous render handler.
pub struct SyncPromptSpec {
    prompt: Prompt,
    handler: Arc<
        dyn Fn(&SyncServerExchange, GetPromptRequest) -> Result<GetPromptResult, McpError>
            + Send
            + Sync,
    >,
}

impl SyncPromptSpec {
    /// Create a sync prompt spec. Fails on a blank prompt name.
    pub fn new<F>(prompt: Prompt, handler: F) -> Result<Self, McpError>
    where
        F: Fn(&SyncServerExchange, GetPromptRequest) -> Result<GetPromptResult, McpError>
            + Send
            + Sync
            + 'static,
    {
        if prompt.name.trim().is_empty() {
            return Err(McpError::validation("prompt name must not be blank"));
        }
        Ok(Self {
            prompt,
            handler: Arc::new(handler),
        })
    }

    fn into_async(self, handle: Handle) -> Result<PromptSpec, McpError> {
        let Self { prompt, handler } = self;
        PromptSpec::new(prompt, move |exchange, request| {
            let handler = Arc::clone(&handler);
            let handle = handle.clone();
            async move {
                let sync_exchange = SyncServerExchange::new(exchange, handle.clone());
                handle
                    .spawn_blocking(move || handler(&sync_exchange, request))
                    .await
                    .map_err(|err| McpError::internal(format!("sync handler aborted: {err}")))?
            }
        })
    }
}

/// A completion backed by a synchronous handler.
pub struct SyncCompletionSpec {
    reference: CompletionReference,
    handler: Arc<
        dyn Fn(&SyncServerExchange, CompleteRequest) -> Result<CompleteResult, McpError>
            + Send
            + Sync,
    >,
}

impl SyncCompletionSpec {
    /// Create a sync completion spec. Fails on a blank reference key.
    pub fn new<F>(reference: CompletionReference, handler: F) -> Result<Self, McpError>
    where
        F: Fn(&SyncServerExchange, CompleteRequest) -> Result<CompleteResult, McpError>
            + Send
            + Sync
            + 'static,
    {
        if reference.key().trim().is_empty() {
            return Err(McpError::validation(
                "completion reference must not be blank",
            ));
        }
        Ok(Self {
            reference,
            handler: Arc::new(handler),
        })
    }

    fn into_async(self, handle: Handle) -> Result<CompletionSpec, McpError> {
        let Self { reference, handler } = self;
        CompletionSpec::new(reference, move |exchange, request| {
            let handler = Arc::clone(&handler);
            let handle = handle.clone();
            async move {
                let sync_exchange = SyncServerExchange::new(exchange, handle.clone());
                handle
                    .spawn_blocking(move || handler(&sync_exchange, request))
                    .await
                    .map_err(|err| McpError::internal(format!("sync handler aborted: {err}")))?
            }
        })
    }
}

/// Blocking adapter over one [`McpServer`].
///
/// Built for callers that want synchronous semantics: construct the async
/// server on a runtime, then drive it from plain threads through this
/// facade.
pub struct SyncMcpServer {
    inner: McpServer,
    handle: Handle,
}

impl SyncMcpServer {
    /// Wrap an async server, using `handle` to reach its runtime.
    #[must_use]
    pub fn new(inner: McpServer, handle: Handle) -> Self {
        Self { inner, handle }
    }

    /// The wrapped async server.
    #[must_use]
    pub const fn async_server(&self) -> &McpServer {
        &self.inner
    }

    /// Blocking [`McpServer::add_tool`] with a synchronous handler.
    pub fn add_tool(&self, spec: SyncToolSpec) -> Result<(), McpError> {
        let spec = spec.into_async(self.handle.clone())?;
        self.handle.block_on(self.inner.add_tool(spec))
    }

    /// Blocking [`McpServer::remove_tool`].
    pub fn remove_tool(&self, name: &str) -> Result<(), McpError> {
        self.handle.block_on(self.inner.remove_tool(name))
    }

    /// Blocking [`McpServer::add_resource`] with a synchronous handler.
    pub fn add_resource(&self, spec: SyncResourceSpec) -> Result<(), McpError> {
        let spec = spec.into_async(self.handle.clone())?;
        self.handle.block_on(self.inner.add_resource(spec))
    }

    /// Blocking [`McpServer::remove_resource`].
    pub fn remove_resource(&self, uri: &str) -> Result<(), McpError> {
        self.handle.block_on(self.inner.remove_resource(uri))
    }

    /// Blocking [`McpServer::add_resource_template`].
    pub fn add_resource_template(&self, spec: ResourceTemplateSpec) -> Result<(), McpError> {
        self.handle
            .block_on(self.inner.add_resource_template(spec))
    }

    /// Blocking [`McpServer::remove_resource_template`].
    pub fn remove_resource_template(&self, uri_template: &str) -> Result<(), McpError> {
        self.handle
            .block_on(self.inner.remove_resource_template(uri_template))
    }

    /// Blocking [`McpServer::add_prompt`] with a synchronous handler.
    pub fn add_prompt(&self, spec: SyncPromptSpec) -> Result<(), McpError> {
        let spec = spec.into_async(self.handle.clone())?;
        self.handle.block_on(self.inner.add_prompt(spec))
    }

    /// Blocking [`McpServer::remove_prompt`].
    pub fn remove_prompt(&self, name: &str) -> Result<(), McpError> {
        self.handle.block_on(self.inner.remove_prompt(name))
    }

    /// Blocking [`McpServer::add_completion`] with a synchronous handler.
    pub fn add_completion(&self, spec: SyncCompletionSpec) -> Result<(), McpError> {
        let spec = spec.into_async(self.handle.clone())?;
        self.inner.add_completion(spec)
    }

    /// Blocking [`McpServer::remove_completion`].
    pub fn remove_completion(&self, reference: &CompletionReference) -> Result<(), McpError> {
        self.inner.remove_completion(reference)
    }

    /// Register a consumer for client root-list changes.
    pub fn on_roots_changed(&self, listener: RootsChangeListener) {
        self.inner.on_roots_changed(listener);
    }

    /// Blocking [`McpServer::shutdown`].
    pub fn shutdown(&self) {
        self.handle.block_on(self.inner.shutdown());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_names_rejected_at_construction() {
        let tool = SyncToolSpec::new(Tool::new(""), |_, _| Ok(CallToolResult::text("x")));
        assert!(tool.is_err());

        let prompt = SyncPromptSpec::new(Prompt::new("   "), |_, _| {
            Ok(GetPromptResult {
                description: None,
                messages: vec![],
            })
        });
        assert!(prompt.is_err());

        let resource = SyncResourceSpec::new(Resource::new("", "x"), |_, _| {
            Ok(ReadResourceResult { contents: vec![] })
        });
        assert!(resource.is_err());
    }
}
