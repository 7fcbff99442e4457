//! Resource descriptors and read payloads.

use serde::{Deserialize, Serialize};

/// A URI-addressed unit of context data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    /// URI identifying the resource. May itself contain `{placeholders}`,
    /// in which case the resource doubles as a template.
    pub uri: String,
    /// Human-readable name.
    pub name: String,
    /// What the resource contains.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// MIME type of the contents.
    #[serde(rename = "mimeType", skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

impl Resource {
    /// Create a resource descriptor.
    #[must_use]
    pub fn new(uri: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            name: name.into(),
            description: None,
            mime_type: None,
        }
    }

    /// Set the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the MIME type.
    #[must_use]
    pub fn mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }
}

/// A descriptor for a family of resources with a templated URI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceTemplate {
    /// URI template with `{placeholders}`.
    #[serde(rename = "uriTemplate")]
    pub uri_template: String,
    /// Human-readable name for the family.
    pub name: String,
    /// What resources of this family contain.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// MIME type of matching resources.
    #[serde(rename = "mimeType", skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

impl ResourceTemplate {
    /// Create a template descriptor.
    #[must_use]
    pub fn new(uri_template: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uri_template: uri_template.into(),
            name: name.into(),
            description: None,
            mime_type: None,
        }
    }

    /// Set the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the MIME type.
    #[must_use]
    pub fn mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }
}

/// One piece of resource content: text or base64 binary, never both.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceContents {
    /// The concrete URI that was read.
    pub uri: String,
    /// MIME type of this piece.
    #[serde(rename = "mimeType", skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// Text payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Base64 binary payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blob: Option<String>,
}

impl ResourceContents {
    /// Text contents with a `text/plain` MIME type.
    #[must_use]
    pub fn text(uri: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            mime_type: Some("text/plain".to_owned()),
            text: Some(text.into()),
            blob: None,
        }
    }

    /// Base64 binary contents.
    #[must_use]
    pub fn blob(
        uri: impl Into<String>,
        blob: impl Into<String>,
        mime_type: impl Into<String>,
    ) -> Self {
        Self {
            uri: uri.into(),
            mime_type: Some(mime_type.into()),
            text: None,
            blob: Some(blob.into()),
        }
    }
}

/// Parameters of `resources/read`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadResourceRequest {
    /// The URI to read. Matched exactly first, then against templates.
    pub uri: String,
}

/// Result of `resources/read`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadResourceResult {
    /// The resource contents.
    pub contents: Vec<ResourceContents>,
}

/// Result of `resources/list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResourcesResult {
    /// Every registered resource descriptor.
    pub resources: Vec<Resource>,
}

/// Result of `resources/templates/list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResourceTemplatesResult {
    /// Explicit templates plus resources whose URI is itself templated.
    #[serde(rename = "resourceTemplates")]
    pub resource_templates: Vec<ResourceTemplate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_builder() {
        let r = Resource::new("config://app", "Config")
            .description("Application settings")
            .mime_type("application/json");
        assert_eq!(r.uri, "config://app");
        assert_eq!(r.mime_type.as_deref(), Some("application/json"));
    }

    #[test]
    fn template_serde_names() {
        let t = ResourceTemplate::new("db://tables/{table}", "Table");
        let json = serde_json::to_value(&t).unwrap();
        assert_eq!(json["uriTemplate"], "db://tables/{table}");
    }

    #[test]
    fn contents_text_and_blob_exclusive() {
        let text = ResourceContents::text("x://a", "hello");
        assert!(text.text.is_some());
        assert!(text.blob.is_none());

        let blob = ResourceContents::blob("x://b", "aGk=", "application/octet-stream");
        assert!(blob.text.is_none());
        assert!(blob.blob.is_some());
    }
}
