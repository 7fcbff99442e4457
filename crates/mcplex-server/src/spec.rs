//! Capability entry types: a descriptor plus its handler.
//!
//! Specs are immutable value types validated at construction. The handler
//! is polymorphic over the exchange handle and the method's typed
//! request/response pair; cloning a spec is cheap (the handler is
//! `Arc`'d), so registries hand out clones and never hold a lock while a
//! handler runs.

use crate::exchange::ServerExchange;
use futures::future::BoxFuture;
use mcplex_core::types::{
    CallToolResult, CompleteRequest, CompleteResult, CompletionReference, GetPromptRequest,
    GetPromptResult, Prompt, ReadResourceRequest, ReadResourceResult, Resource, ResourceTemplate,
    Tool,
};
use mcplex_core::uri_template::{self, UriTemplate};
use mcplex_core::McpError;
use std::future::Future;
use std::sync::Arc;

/// Boxed tool handler: `(exchange, arguments) → CallToolResult`.
pub type ToolHandler = Arc<
    dyn Fn(ServerExchange, serde_json::Value) -> BoxFuture<'static, Result<CallToolResult, McpError>>
        + Send
        + Sync,
>;

/// Boxed resource read handler.
pub type ResourceHandler = Arc<
    dyn Fn(ServerExchange, ReadResourceRequest) -> BoxFuture<'static, Result<ReadResourceResult, McpError>>
        + Send
        + Sync,
>;

/// Boxed prompt render handler.
pub type PromptHandler = Arc<
    dyn Fn(ServerExchange, GetPromptRequest) -> BoxFuture<'static, Result<GetPromptResult, McpError>>
        + Send
        + Sync,
>;

/// Boxed completion handler.
pub type CompletionHandler = Arc<
    dyn Fn(ServerExchange, CompleteRequest) -> BoxFuture<'static, Result<CompleteResult, McpError>>
        + Send
        + Sync,
>;

/// A registered tool: descriptor plus handler. Keyed by tool name.
#[derive(Clone)]
pub struct ToolSpec {
    pub(crate) tool: Tool,
    handler: ToolHandler,
}

impl ToolSpec {
    /// Create a tool spec. Fails on a blank tool name.
    pub fn new<F, Fut>(tool: Tool, handler: F) -> Result<Self, McpError>
    where
        F: Fn(ServerExchange, serde_json::Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<CallToolResult, McpError>> + Send + 'static,
    {
        if tool.name.trim().is_empty() {
            return Err(McpError::validation("tool name must not be blank"));
        }
        Ok(Self {
            tool,
            handler: Arc::new(move |exchange, args| Box::pin(handler(exchange, args))),
        })
    }

    /// The tool's unique name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.tool.name
    }

    /// The tool descriptor.
    #[must_use]
    pub const fn tool(&self) -> &Tool {
        &self.tool
    }

    pub(crate) async fn call(
        &self,
        exchange: ServerExchange,
        arguments: serde_json::Value,
    ) -> Result<CallToolResult, McpError> {
        (self.handler)(exchange, arguments).await
    }
}

/// A registered resource: descriptor plus read handler. Keyed by URI.
///
/// A resource whose URI contains `{placeholders}` doubles as a template:
/// it matches any concrete URI the template accepts and is listed by
/// `resources/templates/list`.
#[derive(Clone)]
pub struct ResourceSpec {
    pub(crate) resource: Resource,
    template: Option<Arc<UriTemplate>>,
    handler: ResourceHandler,
}

impl ResourceSpec {
    /// Create a resource spec. Fails on a blank URI or name, or on a
    /// malformed URI template.
    pub fn new<F, Fut>(resource: Resource, handler: F) -> Result<Self, McpError>
    where
        F: Fn(ServerExchange, ReadResourceRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ReadResourceResult, McpError>> + Send + 'static,
    {
        if resource.uri.trim().is_empty() {
            return Err(McpError::validation("resource uri must not be blank"));
        }
        if resource.name.trim().is_empty() {
            return Err(McpError::validation("resource name must not be blank"));
        }
        let template = if uri_template::is_template(&resource.uri) {
            Some(Arc::new(UriTemplate::parse(resource.uri.clone())?))
        } else {
            None
        };
        Ok(Self {
            resource,
            template,
            handler: Arc::new(move |exchange, request| Box::pin(handler(exchange, request))),
        })
    }

    /// The resource's URI (the registry key).
    #[must_use]
    pub fn uri(&self) -> &str {
        &self.resource.uri
    }

    /// The resource descriptor.
    #[must_use]
    pub const fn resource(&self) -> &Resource {
        &self.resource
    }

    /// Whether the URI is itself a template.
    #[must_use]
    pub const fn is_templated(&self) -> bool {
        self.template.is_some()
    }

    /// The parsed template, when the URI is templated.
    #[must_use]
    pub fn template(&self) -> Option<&UriTemplate> {
        self.template.as_deref()
    }

    /// Whether a requested URI matches this resource, exactly or through
    /// the template.
    #[must_use]
    pub fn matches(&self, uri: &str) -> bool {
        match &self.template {
            Some(template) => template.matches(uri),
            None => self.resource.uri == uri,
        }
    }

    pub(crate) async fn read(
        &self,
        exchange: ServerExchange,
        request: ReadResourceRequest,
    ) -> Result<ReadResourceResult, McpError> {
        (self.handler)(exchange, request).await
    }
}

/// A registered resource template: descriptor only, no handler. Keyed by
/// URI template. Reads still resolve through [`ResourceSpec`] matching.
#[derive(Clone)]
pub struct ResourceTemplateSpec {
    pub(crate) descriptor: ResourceTemplate,
    template: Arc<UriTemplate>,
}

impl ResourceTemplateSpec {
    /// Create a template spec. Fails on a blank name or malformed
    /// template.
    pub fn new(descriptor: ResourceTemplate) -> Result<Self, McpError> {
        if descriptor.name.trim().is_empty() {
            return Err(McpError::validation(
                "resource template name must not be blank",
            ));
        }
        let template = Arc::new(UriTemplate::parse(descriptor.uri_template.clone())?);
        Ok(Self {
            descriptor,
            template,
        })
    }

    /// The template URI (the registry key).
    #[must_use]
    pub fn uri_template(&self) -> &str {
        &self.descriptor.uri_template
    }

    /// The template descriptor.
    #[must_use]
    pub const fn descriptor(&self) -> &ResourceTemplate {
        &self.descriptor
    }

    /// Whether the template declares the given variable.
    #[must_use]
    pub fn has_variable(&self, name: &str) -> bool {
        self.template.has_variable(name)
    }
}

/// A registered prompt: descriptor plus render handler. Keyed by name.
#[derive(Clone)]
pub struct PromptSpec {
    pub(crate) prompt: Prompt,
    handler: PromptHandler,
}

impl PromptSpec {
    /// Create a prompt spec. Fails on a blank prompt name.
    pub fn new<F, Fut>(prompt: Prompt, handler: F) -> Result<Self, McpError>
    where
        F: Fn(ServerExchange, GetPromptRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<GetPromptResult, McpError>> + Send + 'static,
    {
        if prompt.name.trim().is_empty() {
            return Err(McpError::validation("prompt name must not be blank"));
        }
        Ok(Self {
            prompt,
            handler: Arc::new(move |exchange, request| Box::pin(handler(exchange, request))),
        })
    }

    /// The prompt's unique name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.prompt.name
    }

    /// The prompt descriptor.
    #[must_use]
    pub const fn prompt(&self) -> &Prompt {
        &self.prompt
    }

    pub(crate) async fn render(
        &self,
        exchange: ServerExchange,
        request: GetPromptRequest,
    ) -> Result<GetPromptResult, McpError> {
        (self.handler)(exchange, request).await
    }
}

/// A registered completion handler. Keyed by the reference it completes
/// for: a prompt name or a resource-template URI.
#[derive(Clone)]
pub struct CompletionSpec {
    pub(crate) reference: CompletionReference,
    handler: CompletionHandler,
}

impl CompletionSpec {
    /// Create a completion spec. Fails on a blank reference key.
    pub fn new<F, Fut>(reference: CompletionReference, handler: F) -> Result<Self, McpError>
    where
        F: Fn(ServerExchange, CompleteRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<CompleteResult, McpError>> + Send + 'static,
    {
        if reference.key().trim().is_empty() {
            return Err(McpError::validation(
                "completion reference must not be blank",
            ));
        }
        Ok(Self {
            reference,
            handler: Arc::new(move |exchange, request| Box::pin(handler(exchange, request))),
        })
    }

    /// The reference this handler completes for.
    #[must_use]
    pub const fn reference(&self) -> &CompletionReference {
        &self.reference
    }

    pub(crate) async fn complete(
        &self,
        exchange: ServerExchange,
        request: CompleteRequest,
    ) -> Result<CompleteResult, McpError> {
        (self.handler)(exchange, request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcplex_core::types::Completion;

    #[test]
    fn blank_tool_name_rejected() {
        let result = ToolSpec::new(Tool::new("  "), |_, _| async {
            Ok(CallToolResult::text("ok"))
        });
        assert!(matches!(result, Err(McpError::Validation { .. })));
    }

    #[test]
    fn templated_resource_matches() {
        let spec = ResourceSpec::new(
            Resource::new("db://tables/{table}", "Table"),
            |_, request| async move {
                Ok(ReadResourceResult {
                    contents: vec![mcplex_core::types::ResourceContents::text(
                        request.uri,
                        "data",
                    )],
                })
            },
        )
        .unwrap();

        assert!(spec.is_templated());
        assert!(spec.matches("db://tables/users"));
        assert!(!spec.matches("db://tables/users/rows"));
        assert!(!spec.matches("db://other/users"));
    }

    #[test]
    fn exact_resource_matches_only_itself() {
        let spec = ResourceSpec::new(Resource::new("config://app", "Config"), |_, _| async {
            Ok(ReadResourceResult { contents: vec![] })
        })
        .unwrap();

        assert!(!spec.is_templated());
        assert!(spec.matches("config://app"));
        assert!(!spec.matches("config://app/other"));
    }

    #[test]
    fn malformed_template_resource_rejected() {
        let result = ResourceSpec::new(Resource::new("db://tables/{table", "Broken"), |_, _| {
            async { Ok(ReadResourceResult { contents: vec![] }) }
        });
        assert!(result.is_err());
    }

    #[test]
    fn template_spec_variables() {
        let spec =
            ResourceTemplateSpec::new(ResourceTemplate::new("db://tables/{table}", "Table"))
                .unwrap();
        assert!(spec.has_variable("table"));
        assert!(!spec.has_variable("column"));
    }

    #[test]
    fn completion_spec_blank_key_rejected() {
        let result = CompletionSpec::new(CompletionReference::prompt(""), |_, _| async {
            Ok(CompleteResult {
                completion: Completion::of(vec![]),
            })
        });
        assert!(result.is_err());
    }
}
