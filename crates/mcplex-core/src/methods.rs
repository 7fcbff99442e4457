//! Method names of the protocol surface.
//!
//! Kept in one place so the dispatcher, transports, and tests never spell
//! a method string twice.

/// Handshake. Always active, never capability-gated.
pub const INITIALIZE: &str = "initialize";
/// Keep-alive. Always active.
pub const PING: &str = "ping";

/// List registered tools.
pub const TOOLS_LIST: &str = "tools/list";
/// Invoke a tool by name.
pub const TOOLS_CALL: &str = "tools/call";

/// List registered resources.
pub const RESOURCES_LIST: &str = "resources/list";
/// Read a resource by URI (exact or templated).
pub const RESOURCES_READ: &str = "resources/read";
/// List resource templates.
pub const RESOURCES_TEMPLATES_LIST: &str = "resources/templates/list";

/// List registered prompts.
pub const PROMPTS_LIST: &str = "prompts/list";
/// Render a prompt by name.
pub const PROMPTS_GET: &str = "prompts/get";

/// Set the session's minimum logging level.
pub const LOGGING_SET_LEVEL: &str = "logging/setLevel";
/// Autocomplete a prompt argument or resource-template variable.
pub const COMPLETION_COMPLETE: &str = "completion/complete";

/// Server→client: ask the client to run a model generation.
pub const SAMPLING_CREATE_MESSAGE: &str = "sampling/createMessage";
/// Server→client: ask the client for its workspace roots.
pub const ROOTS_LIST: &str = "roots/list";

/// Client→server: handshake confirmation.
pub const NOTIFICATION_INITIALIZED: &str = "notifications/initialized";
/// Server→client: the tool table changed.
pub const NOTIFICATION_TOOLS_CHANGED: &str = "notifications/tools/list_changed";
/// Server→client: the resource table changed.
pub const NOTIFICATION_RESOURCES_CHANGED: &str = "notifications/resources/list_changed";
/// Server→client: the prompt table changed.
pub const NOTIFICATION_PROMPTS_CHANGED: &str = "notifications/prompts/list_changed";
/// Client→server: the root list changed.
pub const NOTIFICATION_ROOTS_CHANGED: &str = "notifications/roots/list_changed";
/// Server→client: a log message.
pub const NOTIFICATION_MESSAGE: &str = "notifications/message";
