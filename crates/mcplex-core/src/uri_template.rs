//! URI templates for parameterized resources.
//!
//! A template is a URI with `{variable}` placeholders, e.g.
//! `db://tables/{table}/rows/{id}`. Variables match exactly one
//! path-segment's worth of text (never an empty string, never across `/`).

use crate::error::McpError;
use std::collections::BTreeMap;

/// A parsed URI template.
#[derive(Debug, Clone)]
pub struct UriTemplate {
    template: String,
    parts: Vec<Part>,
    variables: Vec<String>,
}

#[derive(Debug, Clone)]
enum Part {
    Literal(String),
    Variable(String),
}

/// Whether a URI string contains template placeholders.
#[must_use]
pub fn is_template(uri: &str) -> bool {
    uri.contains('{')
}

impl UriTemplate {
    /// Parse a template string.
    ///
    /// Fails on unbalanced braces, empty or duplicate variable names, and
    /// adjacent variables (which would make matching ambiguous).
    pub fn parse(template: impl Into<String>) -> Result<Self, McpError> {
        let template = template.into();
        let mut parts = Vec::new();
        let mut variables = Vec::new();
        let mut rest = template.as_str();

        while let Some(open) = rest.find('{') {
            let close = rest[open..].find('}').ok_or_else(|| {
                McpError::validation(format!("unbalanced '{{' in uri template: {template}"))
            })? + open;

            if open > 0 {
                parts.push(Part::Literal(rest[..open].to_owned()));
            } else if matches!(parts.last(), Some(Part::Variable(_))) {
                return Err(McpError::validation(format!(
                    "adjacent variables in uri template: {template}"
                )));
            }

            let name = &rest[open + 1..close];
            if name.is_empty() {
                return Err(McpError::validation(format!(
                    "empty variable name in uri template: {template}"
                )));
            }
            if variables.iter().any(|v| v == name) {
                return Err(McpError::validation(format!(
                    "duplicate variable '{name}' in uri template: {template}"
                )));
            }
            variables.push(name.to_owned());
            parts.push(Part::Variable(name.to_owned()));
            rest = &rest[close + 1..];
        }
        if rest.find('}').is_some() {
            return Err(McpError::validation(format!(
                "unbalanced '}}' in uri template: {template}"
            )));
        }
        if !rest.is_empty() {
            parts.push(Part::Literal(rest.to_owned()));
        }

        Ok(Self {
            template,
            parts,
            variables,
        })
    }

    /// The original template string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.template
    }

    /// Variable names, in template order.
    #[must_use]
    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    /// Whether the template declares the given variable.
    #[must_use]
    pub fn has_variable(&self, name: &str) -> bool {
        self.variables.iter().any(|v| v == name)
    }

    /// Whether a concrete URI matches this template.
    #[must_use]
    pub fn matches(&self, uri: &str) -> bool {
        self.extract(uri).is_some()
    }

    /// Match a concrete URI and capture the variable values.
    ///
    /// Returns `None` when the URI does not fit the template.
    #[must_use]
    pub fn extract(&self, uri: &str) -> Option<BTreeMap<String, String>> {
        let mut rest = uri;
        let mut values = BTreeMap::new();
        let mut parts = self.parts.iter().peekable();

        while let Some(part) = parts.next() {
            match part {
                Part::Literal(lit) => {
                    rest = rest.strip_prefix(lit.as_str())?;
                }
                Part::Variable(name) => {
                    let captured = match parts.peek() {
                        Some(Part::Literal(next)) => {
                            let end = rest.find(next.as_str())?;
                            let (head, tail) = rest.split_at(end);
                            rest = tail;
                            head
                        }
                        // Adjacent variables are rejected at parse time.
                        Some(Part::Variable(_)) => return None,
                        None => std::mem::take(&mut rest),
                    };
                    if captured.is_empty() || captured.contains('/') {
                        return None;
                    }
                    values.insert(name.clone(), captured.to_owned());
                }
            }
        }

        rest.is_empty().then_some(values)
    }
}

impl std::fmt::Display for UriTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.template)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_uri_matches_exactly() {
        let t = UriTemplate::parse("config://app/settings").unwrap();
        assert!(t.variables().is_empty());
        assert!(t.matches("config://app/settings"));
        assert!(!t.matches("config://app/settings/extra"));
    }

    #[test]
    fn single_variable() {
        let t = UriTemplate::parse("db://tables/{table}").unwrap();
        assert_eq!(t.variables(), ["table".to_owned()]);

        let vars = t.extract("db://tables/users").unwrap();
        assert_eq!(vars["table"], "users");

        assert!(!t.matches("db://tables/"));
        assert!(!t.matches("db://tables/users/rows"));
    }

    #[test]
    fn multiple_variables() {
        let t = UriTemplate::parse("db://tables/{table}/rows/{id}").unwrap();
        let vars = t.extract("db://tables/users/rows/42").unwrap();
        assert_eq!(vars["table"], "users");
        assert_eq!(vars["id"], "42");
        assert!(t.has_variable("id"));
        assert!(!t.has_variable("row"));
    }

    #[test]
    fn variable_never_spans_segments() {
        let t = UriTemplate::parse("files://{name}.txt").unwrap();
        assert!(t.matches("files://notes.txt"));
        assert!(!t.matches("files://dir/notes.txt"));
    }

    #[test]
    fn malformed_templates_rejected() {
        assert!(UriTemplate::parse("x://{open").is_err());
        assert!(UriTemplate::parse("x://close}").is_err());
        assert!(UriTemplate::parse("x://{}").is_err());
        assert!(UriTemplate::parse("x://{a}/{a}").is_err());
        assert!(UriTemplate::parse("x://{a}{b}").is_err());
    }

    #[test]
    fn template_detection() {
        assert!(is_template("db://tables/{table}"));
        assert!(!is_template("db://tables/users"));
    }
}
