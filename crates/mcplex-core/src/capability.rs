//! Capability negotiation types.
//!
//! Capabilities are exchanged once, during the `initialize` handshake.
//! The server's declared set is fixed at construction; what a client saw
//! at handshake time is not re-validated when registries grow later.

use serde::{Deserialize, Serialize};

/// The newest protocol version this implementation speaks.
pub const LATEST_PROTOCOL_VERSION: &str = "2025-03-26";

/// Every protocol version this implementation accepts, newest first.
pub const SUPPORTED_PROTOCOL_VERSIONS: &[&str] = &["2025-03-26", "2024-11-05"];

/// Negotiate the protocol version for a session.
///
/// A supported requested version is echoed back unchanged; anything else
/// is answered with the server's latest version. The mismatch is the
/// client's problem to resolve (it may disconnect), not a fatal error.
#[must_use]
pub fn negotiate_version(requested: &str) -> &'static str {
    SUPPORTED_PROTOCOL_VERSIONS
        .iter()
        .find(|&&v| v == requested)
        .copied()
        .unwrap_or(LATEST_PROTOCOL_VERSION)
}

/// Feature flags the server declares at construction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerCapabilities {
    /// Tool support.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<ListChangedCapability>,
    /// Resource support.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources: Option<ListChangedCapability>,
    /// Prompt support.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompts: Option<ListChangedCapability>,
    /// Logging support.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingCapability>,
    /// Argument completion support.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completions: Option<CompletionsCapability>,
}

impl ServerCapabilities {
    /// Create an empty capability set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare tool support; `list_changed` enables change notifications.
    #[must_use]
    pub fn with_tools(mut self, list_changed: bool) -> Self {
        self.tools = Some(ListChangedCapability::new(list_changed));
        self
    }

    /// Declare resource support; `list_changed` enables change notifications.
    #[must_use]
    pub fn with_resources(mut self, list_changed: bool) -> Self {
        self.resources = Some(ListChangedCapability::new(list_changed));
        self
    }

    /// Declare prompt support; `list_changed` enables change notifications.
    #[must_use]
    pub fn with_prompts(mut self, list_changed: bool) -> Self {
        self.prompts = Some(ListChangedCapability::new(list_changed));
        self
    }

    /// Declare logging support.
    #[must_use]
    pub fn with_logging(mut self) -> Self {
        self.logging = Some(LoggingCapability {});
        self
    }

    /// Declare completion support.
    #[must_use]
    pub fn with_completions(mut self) -> Self {
        self.completions = Some(CompletionsCapability {});
        self
    }

    /// Whether tools were declared.
    #[must_use]
    pub const fn has_tools(&self) -> bool {
        self.tools.is_some()
    }

    /// Whether resources were declared.
    #[must_use]
    pub const fn has_resources(&self) -> bool {
        self.resources.is_some()
    }

    /// Whether prompts were declared.
    #[must_use]
    pub const fn has_prompts(&self) -> bool {
        self.prompts.is_some()
    }

    /// Whether logging was declared.
    #[must_use]
    pub const fn has_logging(&self) -> bool {
        self.logging.is_some()
    }

    /// Whether completions were declared.
    #[must_use]
    pub const fn has_completions(&self) -> bool {
        self.completions.is_some()
    }
}

/// A capability flag that may carry a `listChanged` sub-flag.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListChangedCapability {
    /// If true, add/remove operations broadcast a change notification.
    #[serde(rename = "listChanged", skip_serializing_if = "Option::is_none")]
    pub list_changed: Option<bool>,
}

impl ListChangedCapability {
    /// Create the flag, with change notifications on or off.
    #[must_use]
    pub const fn new(list_changed: bool) -> Self {
        Self {
            list_changed: Some(list_changed),
        }
    }

    /// Whether change notifications are enabled.
    #[must_use]
    pub fn notifies(&self) -> bool {
        self.list_changed.unwrap_or(false)
    }
}

/// Logging capability flag. Carries no sub-flags.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingCapability {}

/// Completion capability flag. Carries no sub-flags.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompletionsCapability {}

/// Feature flags the client declares during the handshake.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientCapabilities {
    /// Workspace-root support.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roots: Option<ListChangedCapability>,
    /// Model-sampling support.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sampling: Option<SamplingCapability>,
    /// Experimental extensions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub experimental: Option<serde_json::Value>,
}

impl ClientCapabilities {
    /// Create an empty capability set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare roots support; `list_changed` enables change notifications.
    #[must_use]
    pub fn with_roots(mut self, list_changed: bool) -> Self {
        self.roots = Some(ListChangedCapability::new(list_changed));
        self
    }

    /// Declare sampling support.
    #[must_use]
    pub fn with_sampling(mut self) -> Self {
        self.sampling = Some(SamplingCapability {});
        self
    }

    /// Whether roots were declared.
    #[must_use]
    pub const fn has_roots(&self) -> bool {
        self.roots.is_some()
    }

    /// Whether sampling was declared.
    #[must_use]
    pub const fn has_sampling(&self) -> bool {
        self.sampling.is_some()
    }
}

/// Sampling capability flag. Carries no sub-flags.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SamplingCapability {}

/// Identity of one side of the connection (`serverInfo` / `clientInfo`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Implementation {
    /// Implementation name.
    pub name: String,
    /// Implementation version.
    pub version: String,
}

impl Implementation {
    /// Create an identity record.
    #[must_use]
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

/// Parameters of the `initialize` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitializeRequest {
    /// The protocol version the client wants.
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    /// What the client can do.
    pub capabilities: ClientCapabilities,
    /// Who the client is.
    #[serde(rename = "clientInfo")]
    pub client_info: Implementation,
}

/// Result of the `initialize` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitializeResult {
    /// The negotiated protocol version.
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    /// What the server can do.
    pub capabilities: ServerCapabilities,
    /// Who the server is.
    #[serde(rename = "serverInfo")]
    pub server_info: Implementation,
    /// Optional usage instructions for the client's model.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supported_version_is_echoed() {
        assert_eq!(negotiate_version("2024-11-05"), "2024-11-05");
        assert_eq!(negotiate_version("2025-03-26"), "2025-03-26");
    }

    #[test]
    fn unknown_version_gets_latest() {
        assert_eq!(negotiate_version("1999-01-01"), LATEST_PROTOCOL_VERSION);
        assert_eq!(negotiate_version(""), LATEST_PROTOCOL_VERSION);
    }

    #[test]
    fn capability_builders() {
        let caps = ServerCapabilities::new()
            .with_tools(true)
            .with_resources(false)
            .with_logging();

        assert!(caps.has_tools());
        assert!(caps.has_resources());
        assert!(caps.has_logging());
        assert!(!caps.has_prompts());
        assert!(caps.tools.as_ref().unwrap().notifies());
        assert!(!caps.resources.as_ref().unwrap().notifies());
    }

    #[test]
    fn list_changed_serde_name() {
        let caps = ServerCapabilities::new().with_tools(true);
        let json = serde_json::to_value(&caps).unwrap();
        assert_eq!(json["tools"]["listChanged"], true);
        assert!(json.get("resources").is_none());
    }

    #[test]
    fn initialize_result_shape() {
        let result = InitializeResult {
            protocol_version: LATEST_PROTOCOL_VERSION.to_owned(),
            capabilities: ServerCapabilities::new().with_prompts(false),
            server_info: Implementation::new("mcplex", "0.1.0"),
            instructions: Some("call tools/list first".to_owned()),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["protocolVersion"], LATEST_PROTOCOL_VERSION);
        assert_eq!(json["serverInfo"]["name"], "mcplex");
        assert!(json["capabilities"]["prompts"].is_object());
    }

    #[test]
    fn client_capabilities_roundtrip() {
        let caps = ClientCapabilities::new().with_roots(true).with_sampling();
        let json = serde_json::to_string(&caps).unwrap();
        let parsed: ClientCapabilities = serde_json::from_str(&json).unwrap();
        assert!(parsed.has_roots());
        assert!(parsed.has_sampling());
        assert!(parsed.roots.unwrap().notifies());
    }
}
