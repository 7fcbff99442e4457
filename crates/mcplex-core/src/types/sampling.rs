//! Server-initiated model sampling payloads.
//!
//! Sampling inverts the usual direction: the server asks the client to run
//! a model generation on its behalf via `sampling/createMessage`.

use crate::types::content::{Content, Role};
use serde::{Deserialize, Serialize};

/// One message of the sampling conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplingMessage {
    /// Message author.
    pub role: Role,
    /// Message body.
    pub content: Content,
}

impl SamplingMessage {
    /// Create a text message.
    #[must_use]
    pub fn text(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            content: Content::text(text),
        }
    }
}

/// A preferred model, by name substring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelHint {
    /// Model name hint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// The server's preferences for which model the client should pick.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelPreferences {
    /// Ordered model hints.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hints: Option<Vec<ModelHint>>,
    /// Relative weight of low cost, 0 to 1.
    #[serde(rename = "costPriority", skip_serializing_if = "Option::is_none")]
    pub cost_priority: Option<f64>,
    /// Relative weight of low latency, 0 to 1.
    #[serde(rename = "speedPriority", skip_serializing_if = "Option::is_none")]
    pub speed_priority: Option<f64>,
    /// Relative weight of capability, 0 to 1.
    #[serde(
        rename = "intelligencePriority",
        skip_serializing_if = "Option::is_none"
    )]
    pub intelligence_priority: Option<f64>,
}

/// Parameters of `sampling/createMessage`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMessageRequest {
    /// Conversation so far.
    pub messages: Vec<SamplingMessage>,
    /// Model selection preferences.
    #[serde(rename = "modelPreferences", skip_serializing_if = "Option::is_none")]
    pub model_preferences: Option<ModelPreferences>,
    /// System prompt the client should apply.
    #[serde(rename = "systemPrompt", skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    /// Generation budget.
    #[serde(rename = "maxTokens")]
    pub max_tokens: u64,
    /// Sampling temperature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Sequences that end the generation.
    #[serde(rename = "stopSequences", skip_serializing_if = "Option::is_none")]
    pub stop_sequences: Option<Vec<String>>,
}

impl CreateMessageRequest {
    /// Create a request from messages and a token budget.
    #[must_use]
    pub fn new(messages: Vec<SamplingMessage>, max_tokens: u64) -> Self {
        Self {
            messages,
            model_preferences: None,
            system_prompt: None,
            max_tokens,
            temperature: None,
            stop_sequences: None,
        }
    }

    /// Set the system prompt.
    #[must_use]
    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Set the model preferences.
    #[must_use]
    pub fn model_preferences(mut self, preferences: ModelPreferences) -> Self {
        self.model_preferences = Some(preferences);
        self
    }
}

/// Result of `sampling/createMessage`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMessageResult {
    /// The generated message's author (always the assistant).
    pub role: Role,
    /// The generated content.
    pub content: Content,
    /// The model the client actually used.
    pub model: String,
    /// Why generation stopped, if reported.
    #[serde(rename = "stopReason", skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_wire_names() {
        let req = CreateMessageRequest::new(
            vec![SamplingMessage::text(Role::User, "summarize the logs")],
            256,
        )
        .system_prompt("be brief");

        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["maxTokens"], 256);
        assert_eq!(json["systemPrompt"], "be brief");
        assert_eq!(json["messages"][0]["role"], "user");
    }

    #[test]
    fn result_roundtrip() {
        let json = serde_json::json!({
            "role": "assistant",
            "content": {"type": "text", "text": "done"},
            "model": "example-model",
            "stopReason": "endTurn"
        });
        let result: CreateMessageResult = serde_json::from_value(json).unwrap();
        assert_eq!(result.model, "example-model");
        assert_eq!(result.content.as_text(), Some("done"));
    }
}
