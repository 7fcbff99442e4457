//! Client workspace roots.

use serde::{Deserialize, Serialize};

/// A workspace boundary the client has granted the server visibility into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Root {
    /// Root URI, typically `file://`.
    pub uri: String,
    /// Optional display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Root {
    /// Create a root.
    #[must_use]
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            name: None,
        }
    }

    /// Set the display name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Result of the server-initiated `roots/list` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListRootsResult {
    /// The client's current roots.
    pub roots: Vec<Root>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_roundtrip() {
        let root = Root::new("file:///workspace").name("workspace");
        let json = serde_json::to_string(&root).unwrap();
        let parsed: Root = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, root);
    }
}
