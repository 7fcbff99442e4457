//! Argument completion payloads.

use serde::{Deserialize, Serialize};

/// What a completion request is completing against: a prompt argument or
/// a resource-template variable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CompletionReference {
    /// A prompt argument, keyed by prompt name.
    #[serde(rename = "ref/prompt")]
    Prompt {
        /// The prompt name.
        name: String,
    },
    /// A resource-template variable, keyed by template URI.
    #[serde(rename = "ref/resource")]
    Resource {
        /// The template URI.
        uri: String,
    },
}

impl CompletionReference {
    /// Create a prompt reference.
    pub fn prompt(name: impl Into<String>) -> Self {
        Self::Prompt { name: name.into() }
    }

    /// Create a resource reference.
    pub fn resource(uri: impl Into<String>) -> Self {
        Self::Resource { uri: uri.into() }
    }

    /// The key this reference resolves handlers by.
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::Prompt { name } => name,
            Self::Resource { uri } => uri,
        }
    }
}

impl std::fmt::Display for CompletionReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Prompt { name } => write!(f, "ref/prompt:{name}"),
            Self::Resource { uri } => write!(f, "ref/resource:{uri}"),
        }
    }
}

/// The argument being completed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionArgument {
    /// Argument or variable name.
    pub name: String,
    /// The partial value typed so far.
    pub value: String,
}

/// Parameters of `completion/complete`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteRequest {
    /// The entity being completed against.
    #[serde(rename = "ref")]
    pub reference: CompletionReference,
    /// The argument and its partial value.
    pub argument: CompletionArgument,
}

/// Completion values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Completion {
    /// Suggested values.
    pub values: Vec<String>,
    /// Total number of suggestions available, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    /// Whether more suggestions exist than were returned.
    #[serde(rename = "hasMore", skip_serializing_if = "Option::is_none")]
    pub has_more: Option<bool>,
}

impl Completion {
    /// A complete suggestion list.
    #[must_use]
    pub fn of(values: Vec<String>) -> Self {
        let total = values.len() as u64;
        Self {
            values,
            total: Some(total),
            has_more: Some(false),
        }
    }
}

/// Result of `completion/complete`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteResult {
    /// The completion payload.
    pub completion: Completion,
}
