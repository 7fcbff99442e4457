//! Capability registry & dispatcher.
//!
//! [`McpServer`] owns the tool/resource/prompt/completion tables and the
//! request/notification handler map every session dispatches into. It is
//! constructed through [`McpServerBuilder`], connected to exactly one
//! transport, and mutated at runtime through the `add_*`/`remove_*`
//! operations. Each mutation is an atomic check-then-insert (or
//! check-then-remove) that broadcasts a list-changed notification iff the
//! feature declared `listChanged`.
//!
//! There is no server-wide lock: the tables are concurrent maps, mutation
//! is atomic per key, and handlers run on cloned entries, so independent
//! sessions make progress independently and readers never observe a
//! half-updated table.
//!
//! Capability mutation after a session's handshake is deliberate
//! "runtime capability growth": what a client saw at handshake time is
//! not re-validated.

use crate::exchange::ServerExchange;
use crate::session::{
    HandlerSet, Handshake, NotificationHandler, RequestHandler, Session, DEFAULT_REQUEST_TIMEOUT,
};
use crate::spec::{CompletionSpec, PromptSpec, ResourceSpec, ResourceTemplateSpec, ToolSpec};
use dashmap::DashMap;
use mcplex_core::capability::{
    negotiate_version, Implementation, InitializeRequest, InitializeResult, ListChangedCapability,
    ServerCapabilities,
};
use mcplex_core::jsonrpc::Notification;
use mcplex_core::methods;
use mcplex_core::types::{
    CallToolRequest, CompleteRequest, CompletionReference, GetPromptRequest,
    ListPromptsResult, ListResourceTemplatesResult, ListResourcesResult, ListToolsResult,
    ReadResourceRequest, Resource, ResourceTemplate, Root, SetLevelRequest, Tool,
};
use mcplex_core::McpError;
use mcplex_transport::{Connection, ServerTransport, SessionFactory, SessionHandle};
use serde::de::DeserializeOwned;
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// Callback invoked with the refreshed root list after a client announces
/// a roots change.
pub type RootsChangeListener = Arc<dyn Fn(ServerExchange, Vec<Root>) + Send + Sync>;

pub(crate) struct ServerCore {
    info: Implementation,
    capabilities: ServerCapabilities,
    instructions: Option<String>,
    request_timeout: Duration,
    tools: DashMap<String, ToolSpec>,
    resources: DashMap<String, ResourceSpec>,
    templates: DashMap<String, ResourceTemplateSpec>,
    prompts: DashMap<String, PromptSpec>,
    completions: DashMap<CompletionReference, CompletionSpec>,
    roots_listeners: RwLock<Vec<RootsChangeListener>>,
}

impl ServerCore {
    fn require_declared(&self, declared: bool, capability: &str) -> Result<(), McpError> {
        if declared {
            Ok(())
        } else {
            Err(McpError::capability_not_declared(capability))
        }
    }

    fn insert_tool(&self, spec: ToolSpec) -> Result<(), McpError> {
        self.require_declared(self.capabilities.has_tools(), "tools")?;
        match self.tools.entry(spec.name().to_owned()) {
            dashmap::mapref::entry::Entry::Occupied(entry) => {
                Err(McpError::already_registered("tool", entry.key().clone()))
            }
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                entry.insert(spec);
                Ok(())
            }
        }
    }

    fn remove_tool(&self, name: &str) -> Result<(), McpError> {
        self.require_declared(self.capabilities.has_tools(), "tools")?;
        self.tools
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| McpError::tool_not_found(name))
    }

    fn insert_resource(&self, spec: ResourceSpec) -> Result<(), McpError> {
        self.require_declared(self.capabilities.has_resources(), "resources")?;
        match self.resources.entry(spec.uri().to_owned()) {
            dashmap::mapref::entry::Entry::Occupied(entry) => {
                Err(McpError::already_registered("resource", entry.key().clone()))
            }
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                entry.insert(spec);
                Ok(())
            }
        }
    }

    fn remove_resource(&self, uri: &str) -> Result<(), McpError> {
        self.require_declared(self.capabilities.has_resources(), "resources")?;
        self.resources
            .remove(uri)
            .map(|_| ())
            .ok_or_else(|| McpError::resource_not_found(uri))
    }

    fn insert_template(&self, spec: ResourceTemplateSpec) -> Result<(), McpError> {
        self.require_declared(self.capabilities.has_resources(), "resources")?;
        match self.templates.entry(spec.uri_template().to_owned()) {
            dashmap::mapref::entry::Entry::Occupied(entry) => Err(McpError::already_registered(
                "resource template",
                entry.key().clone(),
            )),
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                entry.insert(spec);
                Ok(())
            }
        }
    }

    fn remove_template(&self, uri_template: &str) -> Result<(), McpError> {
        self.require_declared(self.capabilities.has_resources(), "resources")?;
        self.templates
            .remove(uri_template)
            .map(|_| ())
            .ok_or_else(|| McpError::resource_not_found(uri_template))
    }

    fn insert_prompt(&self, spec: PromptSpec) -> Result<(), McpError> {
        self.require_declared(self.capabilities.has_prompts(), "prompts")?;
        match self.prompts.entry(spec.name().to_owned()) {
            dashmap::mapref::entry::Entry::Occupied(entry) => {
                Err(McpError::already_registered("prompt", entry.key().clone()))
            }
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                entry.insert(spec);
                Ok(())
            }
        }
    }

    fn remove_prompt(&self, name: &str) -> Result<(), McpError> {
        self.require_declared(self.capabilities.has_prompts(), "prompts")?;
        self.prompts
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| McpError::prompt_not_found(name))
    }

    fn insert_completion(&self, spec: CompletionSpec) -> Result<(), McpError> {
        self.require_declared(self.capabilities.has_completions(), "completions")?;
        match self.completions.entry(spec.reference().clone()) {
            dashmap::mapref::entry::Entry::Occupied(entry) => Err(McpError::already_registered(
                "completion",
                entry.key().to_string(),
            )),
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                entry.insert(spec);
                Ok(())
            }
        }
    }

    fn remove_completion(&self, reference: &CompletionReference) -> Result<(), McpError> {
        self.require_declared(self.capabilities.has_completions(), "completions")?;
        self.completions
            .remove(reference)
            .map(|_| ())
            .ok_or_else(|| McpError::completion_not_found(reference.to_string()))
    }

    fn tools_snapshot(&self) -> Vec<Tool> {
        let mut tools: Vec<Tool> = self
            .tools
            .iter()
            .map(|entry| entry.value().tool().clone())
            .collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        tools
    }

    fn resources_snapshot(&self) -> Vec<Resource> {
        let mut resources: Vec<Resource> = self
            .resources
            .iter()
            .filter(|entry| !entry.value().is_templated())
            .map(|entry| entry.value().resource().clone())
            .collect();
        resources.sort_by(|a, b| a.uri.cmp(&b.uri));
        resources
    }

    fn templates_snapshot(&self) -> Vec<ResourceTemplate> {
        let mut templates: Vec<ResourceTemplate> = self
            .templates
            .iter()
            .map(|entry| entry.value().descriptor().clone())
            .collect();
        // A resource whose URI is itself a template is listed here too.
        for entry in self.resources.iter() {
            let spec = entry.value();
            if spec.is_templated() {
                let resource = spec.resource();
                let mut template = ResourceTemplate::new(&resource.uri, &resource.name);
                template.description.clone_from(&resource.description);
                template.mime_type.clone_from(&resource.mime_type);
                templates.push(template);
            }
        }
        templates.sort_by(|a, b| a.uri_template.cmp(&b.uri_template));
        templates
    }

    fn prompts_snapshot(&self) -> Vec<mcplex_core::types::Prompt> {
        let mut prompts: Vec<mcplex_core::types::Prompt> = self
            .prompts
            .iter()
            .map(|entry| entry.value().prompt().clone())
            .collect();
        prompts.sort_by(|a, b| a.name.cmp(&b.name));
        prompts
    }

    fn find_resource(&self, uri: &str) -> Option<ResourceSpec> {
        if let Some(entry) = self.resources.get(uri) {
            return Some(entry.value().clone());
        }
        self.resources.iter().find_map(|entry| {
            let spec = entry.value();
            spec.matches(uri).then(|| spec.clone())
        })
    }

    /// Whether the template behind `uri` declares `variable`. Fails with
    /// resource-not-found when nothing templated is registered at `uri`.
    fn template_declares_variable(&self, uri: &str, variable: &str) -> Result<bool, McpError> {
        if let Some(entry) = self.templates.get(uri) {
            return Ok(entry.value().has_variable(variable));
        }
        if let Some(entry) = self.resources.get(uri) {
            if let Some(template) = entry.value().template() {
                return Ok(template.has_variable(variable));
            }
        }
        Err(McpError::resource_not_found(uri))
    }

    fn roots_listeners(&self) -> Vec<RootsChangeListener> {
        self.roots_listeners
            .read()
            .map(|listeners| listeners.clone())
            .unwrap_or_default()
    }
}

/// The capability registry & dispatcher, bound to one transport.
pub struct McpServer {
    core: Arc<ServerCore>,
    transport: Arc<dyn ServerTransport>,
}

impl McpServer {
    /// Start building a server.
    #[must_use]
    pub fn builder(name: impl Into<String>, version: impl Into<String>) -> McpServerBuilder {
        McpServerBuilder::new(Implementation::new(name, version))
    }

    /// The server's identity.
    #[must_use]
    pub fn server_info(&self) -> &Implementation {
        &self.core.info
    }

    /// The declared capability set.
    #[must_use]
    pub fn capabilities(&self) -> &ServerCapabilities {
        &self.core.capabilities
    }

    /// The configured request timeout for server→client calls.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        self.core.request_timeout
    }

    /// Register a tool. Fails when the tools capability was not declared
    /// or the name is already taken; the existing entry is never
    /// overwritten. Broadcasts `notifications/tools/list_changed` iff the
    /// capability declared `listChanged`.
    pub async fn add_tool(&self, spec: ToolSpec) -> Result<(), McpError> {
        self.core.insert_tool(spec)?;
        self.broadcast_if(
            self.core.capabilities.tools.as_ref(),
            methods::NOTIFICATION_TOOLS_CHANGED,
        )
        .await;
        Ok(())
    }

    /// Remove a tool by name. Fails when it is absent.
    pub async fn remove_tool(&self, name: &str) -> Result<(), McpError> {
        self.core.remove_tool(name)?;
        self.broadcast_if(
            self.core.capabilities.tools.as_ref(),
            methods::NOTIFICATION_TOOLS_CHANGED,
        )
        .await;
        Ok(())
    }

    /// Register a resource, keyed by URI. Same contract as [`Self::add_tool`].
    pub async fn add_resource(&self, spec: ResourceSpec) -> Result<(), McpError> {
        self.core.insert_resource(spec)?;
        self.broadcast_if(
            self.core.capabilities.resources.as_ref(),
            methods::NOTIFICATION_RESOURCES_CHANGED,
        )
        .await;
        Ok(())
    }

    /// Remove a resource by URI. Fails when it is absent.
    pub async fn remove_resource(&self, uri: &str) -> Result<(), McpError> {
        self.core.remove_resource(uri)?;
        self.broadcast_if(
            self.core.capabilities.resources.as_ref(),
            methods::NOTIFICATION_RESOURCES_CHANGED,
        )
        .await;
        Ok(())
    }

    /// Register a resource template, keyed by its URI template.
    pub async fn add_resource_template(
        &self,
        spec: ResourceTemplateSpec,
    ) -> Result<(), McpError> {
        self.core.insert_template(spec)?;
        self.broadcast_if(
            self.core.capabilities.resources.as_ref(),
            methods::NOTIFICATION_RESOURCES_CHANGED,
        )
        .await;
        Ok(())
    }

    /// Remove a resource template. Fails when it is absent.
    pub async fn remove_resource_template(&self, uri_template: &str) -> Result<(), McpError> {
        self.core.remove_template(uri_template)?;
        self.broadcast_if(
            self.core.capabilities.resources.as_ref(),
            methods::NOTIFICATION_RESOURCES_CHANGED,
        )
        .await;
        Ok(())
    }

    /// Register a prompt, keyed by name. Same contract as [`Self::add_tool`].
    pub async fn add_prompt(&self, spec: PromptSpec) -> Result<(), McpError> {
        self.core.insert_prompt(spec)?;
        self.broadcast_if(
            self.core.capabilities.prompts.as_ref(),
            methods::NOTIFICATION_PROMPTS_CHANGED,
        )
        .await;
        Ok(())
    }

    /// Remove a prompt by name. Fails when it is absent.
    pub async fn remove_prompt(&self, name: &str) -> Result<(), McpError> {
        self.core.remove_prompt(name)?;
        self.broadcast_if(
            self.core.capabilities.prompts.as_ref(),
            methods::NOTIFICATION_PROMPTS_CHANGED,
        )
        .await;
        Ok(())
    }

    /// Register a completion handler for a prompt argument or
    /// resource-template variable reference.
    pub fn add_completion(&self, spec: CompletionSpec) -> Result<(), McpError> {
        self.core.insert_completion(spec)
    }

    /// Remove a completion handler. Fails when it is absent.
    pub fn remove_completion(&self, reference: &CompletionReference) -> Result<(), McpError> {
        self.core.remove_completion(reference)
    }

    /// Register a consumer for client root-list changes.
    pub fn on_roots_changed(&self, listener: RootsChangeListener) {
        if let Ok(mut listeners) = self.core.roots_listeners.write() {
            listeners.push(listener);
        }
    }

    /// Shut down: stop accepting connections, close every session with a
    /// bounded wait.
    pub async fn shutdown(&self) {
        self.transport.shutdown().await;
    }

    async fn broadcast_if(&self, flag: Option<&ListChangedCapability>, method: &'static str) {
        if flag.is_some_and(ListChangedCapability::notifies) {
            self.transport.broadcast(Notification::new(method)).await;
        }
    }
}

/// Builder for [`McpServer`].
pub struct McpServerBuilder {
    info: Implementation,
    capabilities: ServerCapabilities,
    instructions: Option<String>,
    request_timeout: Duration,
    tools: Vec<ToolSpec>,
    resources: Vec<ResourceSpec>,
    templates: Vec<ResourceTemplateSpec>,
    prompts: Vec<PromptSpec>,
    completions: Vec<CompletionSpec>,
    roots_listeners: Vec<RootsChangeListener>,
}

impl McpServerBuilder {
    /// Create a builder for a server with the given identity.
    #[must_use]
    pub fn new(info: Implementation) -> Self {
        Self {
            info,
            capabilities: ServerCapabilities::default(),
            instructions: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            tools: Vec::new(),
            resources: Vec::new(),
            templates: Vec::new(),
            prompts: Vec::new(),
            completions: Vec::new(),
            roots_listeners: Vec::new(),
        }
    }

    /// Declare the server's capability set.
    #[must_use]
    pub fn capabilities(mut self, capabilities: ServerCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Usage instructions returned from the handshake.
    #[must_use]
    pub fn instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    /// Timeout for server→client requests (default 10 s).
    #[must_use]
    pub const fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Register a tool before connecting.
    #[must_use]
    pub fn tool(mut self, spec: ToolSpec) -> Self {
        self.tools.push(spec);
        self
    }

    /// Register a resource before connecting.
    #[must_use]
    pub fn resource(mut self, spec: ResourceSpec) -> Self {
        self.resources.push(spec);
        self
    }

    /// Register a resource template before connecting.
    #[must_use]
    pub fn resource_template(mut self, spec: ResourceTemplateSpec) -> Self {
        self.templates.push(spec);
        self
    }

    /// Register a prompt before connecting.
    #[must_use]
    pub fn prompt(mut self, spec: PromptSpec) -> Self {
        self.prompts.push(spec);
        self
    }

    /// Register a completion handler before connecting.
    #[must_use]
    pub fn completion(mut self, spec: CompletionSpec) -> Self {
        self.completions.push(spec);
        self
    }

    /// Register a consumer for client root-list changes.
    #[must_use]
    pub fn on_roots_changed(mut self, listener: RootsChangeListener) -> Self {
        self.roots_listeners.push(listener);
        self
    }

    /// Validate the initial tables, install the handler map, and bind the
    /// server to a transport.
    pub async fn connect<T>(self, transport: Arc<T>) -> Result<McpServer, McpError>
    where
        T: ServerTransport + 'static,
    {
        let core = Arc::new(ServerCore {
            info: self.info,
            capabilities: self.capabilities,
            instructions: self.instructions,
            request_timeout: self.request_timeout,
            tools: DashMap::new(),
            resources: DashMap::new(),
            templates: DashMap::new(),
            prompts: DashMap::new(),
            completions: DashMap::new(),
            roots_listeners: RwLock::new(self.roots_listeners),
        });

        for spec in self.tools {
            core.insert_tool(spec)?;
        }
        for spec in self.resources {
            core.insert_resource(spec)?;
        }
        for spec in self.templates {
            core.insert_template(spec)?;
        }
        for spec in self.prompts {
            core.insert_prompt(spec)?;
        }
        for spec in self.completions {
            core.insert_completion(spec)?;
        }

        let handlers = Arc::new(build_handler_set(&core));
        let factory: SessionFactory = {
            let handlers = Arc::clone(&handlers);
            let request_timeout = core.request_timeout;
            Arc::new(move |connection: Arc<dyn Connection>| {
                Session::new(connection, Arc::clone(&handlers), request_timeout)
                    as Arc<dyn SessionHandle>
            })
        };

        let transport: Arc<dyn ServerTransport> = transport;
        transport.serve(factory).await.map_err(McpError::from)?;

        Ok(McpServer { core, transport })
    }
}

fn parse_params<T: DeserializeOwned>(
    method: &'static str,
    params: Option<serde_json::Value>,
) -> Result<T, McpError> {
    let params = params.ok_or_else(|| McpError::invalid_params(method, "missing params"))?;
    serde_json::from_value(params).map_err(|err| McpError::invalid_params(method, err.to_string()))
}

fn to_value<T: serde::Serialize>(value: &T) -> Result<serde_json::Value, McpError> {
    serde_json::to_value(value).map_err(McpError::from)
}

/// Build the request/notification handler map for the declared
/// capabilities. `initialize` and `ping` are always active; everything
/// else is installed only when its capability was declared.
fn build_handler_set(core: &Arc<ServerCore>) -> HandlerSet {
    let mut handlers = HandlerSet::default();

    handlers
        .requests
        .insert(methods::INITIALIZE, initialize_handler(core));
    handlers.requests.insert(
        methods::PING,
        Arc::new(|_, _| Box::pin(async { Ok(serde_json::json!({})) })),
    );

    if core.capabilities.has_tools() {
        handlers
            .requests
            .insert(methods::TOOLS_LIST, tools_list_handler(core));
        handlers
            .requests
            .insert(methods::TOOLS_CALL, tools_call_handler(core));
    }
    if core.capabilities.has_resources() {
        handlers
            .requests
            .insert(methods::RESOURCES_LIST, resources_list_handler(core));
        handlers
            .requests
            .insert(methods::RESOURCES_READ, resources_read_handler(core));
        handlers.requests.insert(
            methods::RESOURCES_TEMPLATES_LIST,
            templates_list_handler(core),
        );
    }
    if core.capabilities.has_prompts() {
        handlers
            .requests
            .insert(methods::PROMPTS_LIST, prompts_list_handler(core));
        handlers
            .requests
            .insert(methods::PROMPTS_GET, prompts_get_handler(core));
    }
    if core.capabilities.has_logging() {
        handlers
            .requests
            .insert(methods::LOGGING_SET_LEVEL, set_level_handler());
    }
    if core.capabilities.has_completions() {
        handlers
            .requests
            .insert(methods::COMPLETION_COMPLETE, complete_handler(core));
    }

    handlers.notifications.insert(
        methods::NOTIFICATION_INITIALIZED,
        Arc::new(|exchange, _| {
            Box::pin(async move {
                tracing::info!(session = %exchange.session_id(), "client confirmed initialization");
            })
        }),
    );
    handlers.notifications.insert(
        methods::NOTIFICATION_ROOTS_CHANGED,
        roots_changed_handler(core),
    );

    handlers
}

fn initialize_handler(core: &Arc<ServerCore>) -> RequestHandler {
    let core = Arc::clone(core);
    Arc::new(move |exchange, params| {
        let core = Arc::clone(&core);
        Box::pin(async move {
            let request: InitializeRequest = parse_params(methods::INITIALIZE, params)?;
            let negotiated = negotiate_version(&request.protocol_version);
            if negotiated == request.protocol_version {
                tracing::debug!(
                    session = %exchange.session_id(),
                    version = %negotiated,
                    "protocol version negotiated"
                );
            } else {
                tracing::info!(
                    session = %exchange.session_id(),
                    requested = %request.protocol_version,
                    negotiated = %negotiated,
                    "client requested unsupported protocol version"
                );
            }

            exchange.session().record_handshake(Handshake {
                protocol_version: negotiated.to_owned(),
                client_info: request.client_info,
                client_capabilities: request.capabilities,
            })?;

            let result = InitializeResult {
                protocol_version: negotiated.to_owned(),
                capabilities: core.capabilities.clone(),
                server_info: core.info.clone(),
                instructions: core.instructions.clone(),
            };
            to_value(&result)
        })
    })
}

fn tools_list_handler(core: &Arc<ServerCore>) -> RequestHandler {
    let core = Arc::clone(core);
    Arc::new(move |_, _| {
        let core = Arc::clone(&core);
        Box::pin(async move {
            to_value(&ListToolsResult {
                tools: core.tools_snapshot(),
            })
        })
    })
}

fn tools_call_handler(core: &Arc<ServerCore>) -> RequestHandler {
    let core = Arc::clone(core);
    Arc::new(move |exchange, params| {
        let core = Arc::clone(&core);
        Box::pin(async move {
            let request: CallToolRequest = parse_params(methods::TOOLS_CALL, params)?;
            let spec = core
                .tools
                .get(&request.name)
                .map(|entry| entry.value().clone())
                .ok_or_else(|| McpError::tool_not_found(&request.name))?;
            let arguments = request.arguments.unwrap_or_else(|| serde_json::json!({}));
            let result = spec.call(exchange, arguments).await?;
            to_value(&result)
        })
    })
}

fn resources_list_handler(core: &Arc<ServerCore>) -> RequestHandler {
    let core = Arc::clone(core);
    Arc::new(move |_, _| {
        let core = Arc::clone(&core);
        Box::pin(async move {
            to_value(&ListResourcesResult {
                resources: core.resources_snapshot(),
            })
        })
    })
}

fn templates_list_handler(core: &Arc<ServerCore>) -> RequestHandler {
    let core = Arc::clone(core);
    Arc::new(move |_, _| {
        let core = Arc::clone(&core);
        Box::pin(async move {
            to_value(&ListResourceTemplatesResult {
                resource_templates: core.templates_snapshot(),
            })
        })
    })
}

fn resources_read_handler(core: &Arc<ServerCore>) -> RequestHandler {
    let core = Arc::clone(core);
    Arc::new(move |exchange, params| {
        let core = Arc::clone(&core);
        Box::pin(async move {
            let request: ReadResourceRequest = parse_params(methods::RESOURCES_READ, params)?;
            let spec = core
                .find_resource(&request.uri)
                .ok_or_else(|| McpError::resource_not_found(&request.uri))?;
            let result = spec.read(exchange, request).await?;
            to_value(&result)
        })
    })
}

fn prompts_list_handler(core: &Arc<ServerCore>) -> RequestHandler {
    let core = Arc::clone(core);
    Arc::new(move |_, _| {
        let core = Arc::clone(&core);
        Box::pin(async move {
            to_value(&ListPromptsResult {
                prompts: core.prompts_snapshot(),
            })
        })
    })
}

fn prompts_get_handler(core: &Arc<ServerCore>) -> RequestHandler {
    let core = Arc::clone(core);
    Arc::new(move |exchange, params| {
        let core = Arc::clone(&core);
        Box::pin(async move {
            let request: GetPromptRequest = parse_params(methods::PROMPTS_GET, params)?;
            let spec = core
                .prompts
                .get(&request.name)
                .map(|entry| entry.value().clone())
                .ok_or_else(|| McpError::prompt_not_found(&request.name))?;
            let result = spec.render(exchange, request).await?;
            to_value(&result)
        })
    })
}

fn set_level_handler() -> RequestHandler {
    Arc::new(move |exchange, params| {
        Box::pin(async move {
            let request: SetLevelRequest = parse_params(methods::LOGGING_SET_LEVEL, params)?;
            exchange.session().set_min_log_level(request.level);
            Ok(serde_json::json!({}))
        })
    })
}

fn complete_handler(core: &Arc<ServerCore>) -> RequestHandler {
    let core = Arc::clone(core);
    Arc::new(move |exchange, params| {
        let core = Arc::clone(&core);
        Box::pin(async move {
            let request: CompleteRequest = parse_params(methods::COMPLETION_COMPLETE, params)?;

            // The referenced entity must exist and must declare the named
            // argument before any handler lookup happens.
            match &request.reference {
                CompletionReference::Prompt { name } => {
                    let spec = core
                        .prompts
                        .get(name)
                        .map(|entry| entry.value().clone())
                        .ok_or_else(|| McpError::prompt_not_found(name))?;
                    if !spec.prompt().has_argument(&request.argument.name) {
                        return Err(McpError::invalid_params(
                            methods::COMPLETION_COMPLETE,
                            format!(
                                "prompt '{name}' declares no argument '{}'",
                                request.argument.name
                            ),
                        ));
                    }
                }
                CompletionReference::Resource { uri } => {
                    if !core.template_declares_variable(uri, &request.argument.name)? {
                        return Err(McpError::invalid_params(
                            methods::COMPLETION_COMPLETE,
                            format!(
                                "template '{uri}' declares no variable '{}'",
                                request.argument.name
                            ),
                        ));
                    }
                }
            }

            let spec = core
                .completions
                .get(&request.reference)
                .map(|entry| entry.value().clone())
                .ok_or_else(|| McpError::completion_not_found(request.reference.to_string()))?;
            let result = spec.complete(exchange, request).await?;
            to_value(&result)
        })
    })
}

fn roots_changed_handler(core: &Arc<ServerCore>) -> NotificationHandler {
    let core = Arc::clone(core);
    Arc::new(move |exchange, _params| {
        let core = Arc::clone(&core);
        Box::pin(async move {
            let listeners = core.roots_listeners();
            if listeners.is_empty() {
                tracing::warn!(
                    session = %exchange.session_id(),
                    "roots list changed but no consumer is registered; dropping the event"
                );
                return;
            }
            match exchange.list_roots().await {
                Ok(result) => {
                    for listener in &listeners {
                        listener(exchange.clone(), result.roots.clone());
                    }
                }
                Err(err) => {
                    tracing::warn!(
                        session = %exchange.session_id(),
                        error = %err,
                        "failed to refresh roots after change notification"
                    );
                }
            }
        })
    })
}
