//! Tool descriptors and invocation payloads.

use crate::types::content::Content;
use serde::{Deserialize, Serialize};

/// A named, schema-described callable capability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tool {
    /// Unique tool name.
    pub name: String,
    /// What the tool does.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON schema describing the accepted arguments.
    #[serde(rename = "inputSchema")]
    pub input_schema: serde_json::Value,
}

impl Tool {
    /// Create a tool with an empty object schema.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            input_schema: serde_json::json!({"type": "object", "properties": {}}),
        }
    }

    /// Set the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the input schema.
    #[must_use]
    pub fn input_schema(mut self, schema: serde_json::Value) -> Self {
        self.input_schema = schema;
        self
    }
}

/// Parameters of `tools/call`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallToolRequest {
    /// The tool to invoke.
    pub name: String,
    /// Arguments matching the tool's input schema.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arguments: Option<serde_json::Value>,
}

/// Result of `tools/call`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallToolResult {
    /// Output content blocks.
    pub content: Vec<Content>,
    /// True when the tool itself failed in a way the model may correct.
    #[serde(rename = "isError", skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

impl CallToolResult {
    /// A successful single-text result.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![Content::text(text)],
            is_error: None,
        }
    }

    /// A tool-level failure the model can see and react to.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![Content::text(message)],
            is_error: Some(true),
        }
    }
}

/// Result of `tools/list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListToolsResult {
    /// Every registered tool descriptor.
    pub tools: Vec<Tool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_builder_defaults() {
        let tool = Tool::new("search").description("Search the index");
        assert_eq!(tool.name, "search");
        assert_eq!(tool.input_schema["type"], "object");
    }

    #[test]
    fn input_schema_serde_name() {
        let tool = Tool::new("t").input_schema(serde_json::json!({
            "type": "object",
            "properties": {"q": {"type": "string"}},
            "required": ["q"]
        }));
        let json = serde_json::to_value(&tool).unwrap();
        assert!(json["inputSchema"]["required"].is_array());
        assert!(json.get("description").is_none());
    }

    #[test]
    fn call_result_error_flag() {
        let ok = CallToolResult::text("done");
        assert!(ok.is_error.is_none());

        let failed = CallToolResult::error("divide by zero");
        assert_eq!(failed.is_error, Some(true));
        assert_eq!(failed.content[0].as_text(), Some("divide by zero"));
    }
}
