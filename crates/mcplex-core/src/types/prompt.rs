//! Prompt descriptors and rendering payloads.

use crate::types::content::{Content, Role};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A named, parameterized message template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prompt {
    /// Unique prompt name.
    pub name: String,
    /// What the prompt is for.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Declared arguments.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub arguments: Vec<PromptArgument>,
}

impl Prompt {
    /// Create a prompt with no arguments.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            arguments: Vec::new(),
        }
    }

    /// Set the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Declare an argument.
    #[must_use]
    pub fn argument(mut self, argument: PromptArgument) -> Self {
        self.arguments.push(argument);
        self
    }

    /// Whether the prompt declares the given argument.
    #[must_use]
    pub fn has_argument(&self, name: &str) -> bool {
        self.arguments.iter().any(|a| a.name == name)
    }
}

/// One declared prompt argument.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptArgument {
    /// Argument name.
    pub name: String,
    /// What the argument controls.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether the argument must be supplied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
}

impl PromptArgument {
    /// Create an optional argument.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            required: None,
        }
    }

    /// Set the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Mark the argument required.
    #[must_use]
    pub const fn required(mut self) -> Self {
        self.required = Some(true);
        self
    }
}

/// One rendered prompt message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptMessage {
    /// Message author.
    pub role: Role,
    /// Message body.
    pub content: Content,
}

impl PromptMessage {
    /// Create a text message.
    #[must_use]
    pub fn text(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            content: Content::text(text),
        }
    }
}

/// Parameters of `prompts/get`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetPromptRequest {
    /// The prompt to render.
    pub name: String,
    /// Argument values by name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arguments: Option<BTreeMap<String, String>>,
}

/// Result of `prompts/get`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetPromptResult {
    /// What the rendered prompt is for.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// The rendered messages.
    pub messages: Vec<PromptMessage>,
}

/// Result of `prompts/list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListPromptsResult {
    /// Every registered prompt descriptor.
    pub prompts: Vec<Prompt>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_arguments() {
        let prompt = Prompt::new("code-review")
            .description("Review a diff")
            .argument(PromptArgument::new("language").required())
            .argument(PromptArgument::new("style"));

        assert!(prompt.has_argument("language"));
        assert!(prompt.has_argument("style"));
        assert!(!prompt.has_argument("diff"));
        assert_eq!(prompt.arguments[0].required, Some(true));
    }

    #[test]
    fn empty_arguments_omitted() {
        let json = serde_json::to_value(Prompt::new("plain")).unwrap();
        assert!(json.get("arguments").is_none());

        let parsed: Prompt = serde_json::from_value(serde_json::json!({"name": "p"})).unwrap();
        assert!(parsed.arguments.is_empty());
    }

    #[test]
    fn prompt_message_roundtrip() {
        let msg = PromptMessage::text(Role::User, "review this");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "user");
        assert_eq!(json["content"]["text"], "review this");
    }
}
