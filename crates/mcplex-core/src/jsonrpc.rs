//! JSON-RPC 2.0 message envelope.
//!
//! Every MCP exchange is one of three frame shapes: a request (carries an
//! id and expects a correlated response), a response (success or error,
//! never both), or a notification (no id, fire-and-forget).
//!
//! # Example
//!
//! ```rust
//! use mcplex_core::jsonrpc::{Message, Request, RequestId};
//!
//! let req = Request::new("tools/list", RequestId::Number(1));
//! let frame: Message = req.into();
//! assert!(frame.is_request());
//! ```

use serde::{Deserialize, Serialize};

/// The JSON-RPC protocol version carried in every frame.
pub const JSONRPC_VERSION: &str = "2.0";

/// Correlation id for a request/response pair.
///
/// The wire permits both numeric and string ids. Server-generated ids are
/// always numeric (a monotonic counter); client ids are echoed back as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// Numeric id.
    Number(u64),
    /// String id.
    String(String),
}

impl From<u64> for RequestId {
    fn from(id: u64) -> Self {
        Self::Number(id)
    }
}

impl From<&str> for RequestId {
    fn from(id: &str) -> Self {
        Self::String(id.to_owned())
    }
}

impl From<String> for RequestId {
    fn from(id: String) -> Self {
        Self::String(id)
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => f.write_str(s),
        }
    }
}

/// A method call that expects a correlated response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Always `"2.0"`.
    pub jsonrpc: String,
    /// Correlation id echoed in the response.
    pub id: RequestId,
    /// Method name, e.g. `tools/call`.
    pub method: String,
    /// Method parameters, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl Request {
    /// Create a request without parameters.
    #[must_use]
    pub fn new(method: impl Into<String>, id: impl Into<RequestId>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_owned(),
            id: id.into(),
            method: method.into(),
            params: None,
        }
    }

    /// Create a request with parameters.
    #[must_use]
    pub fn with_params(
        method: impl Into<String>,
        id: impl Into<RequestId>,
        params: serde_json::Value,
    ) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_owned(),
            id: id.into(),
            method: method.into(),
            params: Some(params),
        }
    }
}

/// A reply to a request: a result on success, an [`ErrorData`] on failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// Always `"2.0"`.
    pub jsonrpc: String,
    /// The id of the request being answered.
    pub id: RequestId,
    /// Success payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    /// Failure payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorData>,
}

impl Response {
    /// Build a success response.
    #[must_use]
    pub fn success(id: RequestId, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_owned(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Build an error response.
    #[must_use]
    pub fn failure(id: RequestId, error: ErrorData) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_owned(),
            id,
            result: None,
            error: Some(error),
        }
    }

    /// Whether this response carries an error.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Unpack into a result, treating a missing body as an internal error.
    pub fn into_result(self) -> Result<serde_json::Value, ErrorData> {
        match (self.result, self.error) {
            (_, Some(error)) => Err(error),
            (Some(result), None) => Ok(result),
            (None, None) => Err(ErrorData::new(
                ErrorCode::InternalError,
                "response carried neither result nor error",
            )),
        }
    }
}

/// A one-way message with no response and no id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    /// Always `"2.0"`.
    pub jsonrpc: String,
    /// Method name, e.g. `notifications/tools/list_changed`.
    pub method: String,
    /// Parameters, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl Notification {
    /// Create a notification without parameters.
    #[must_use]
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_owned(),
            method: method.into(),
            params: None,
        }
    }

    /// Create a notification with parameters.
    #[must_use]
    pub fn with_params(method: impl Into<String>, params: serde_json::Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_owned(),
            method: method.into(),
            params: Some(params),
        }
    }
}

/// Any inbound or outbound frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Message {
    /// A request expecting a response.
    Request(Request),
    /// A response to an earlier request.
    Response(Response),
    /// A fire-and-forget notification.
    Notification(Notification),
}

impl Message {
    /// Method name, for requests and notifications.
    #[must_use]
    pub fn method(&self) -> Option<&str> {
        match self {
            Self::Request(r) => Some(&r.method),
            Self::Notification(n) => Some(&n.method),
            Self::Response(_) => None,
        }
    }

    /// Correlation id, for requests and responses.
    #[must_use]
    pub const fn id(&self) -> Option<&RequestId> {
        match self {
            Self::Request(r) => Some(&r.id),
            Self::Response(r) => Some(&r.id),
            Self::Notification(_) => None,
        }
    }

    /// Whether this is a request frame.
    #[must_use]
    pub const fn is_request(&self) -> bool {
        matches!(self, Self::Request(_))
    }

    /// Whether this is a response frame.
    #[must_use]
    pub const fn is_response(&self) -> bool {
        matches!(self, Self::Response(_))
    }

    /// Whether this is a notification frame.
    #[must_use]
    pub const fn is_notification(&self) -> bool {
        matches!(self, Self::Notification(_))
    }
}

impl From<Request> for Message {
    fn from(r: Request) -> Self {
        Self::Request(r)
    }
}

impl From<Response> for Message {
    fn from(r: Response) -> Self {
        Self::Response(r)
    }
}

impl From<Notification> for Message {
    fn from(n: Notification) -> Self {
        Self::Notification(n)
    }
}

/// A JSON-RPC error code.
///
/// The known codes from the JSON-RPC 2.0 specification plus the MCP
/// resource-not-found extension are named variants; anything else round
/// trips through [`ErrorCode::Other`] so unknown peer codes are preserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum ErrorCode {
    /// Invalid JSON was received (-32700).
    ParseError,
    /// The frame is not a valid request object (-32600).
    InvalidRequest,
    /// The method does not exist (-32601).
    MethodNotFound,
    /// Invalid method parameters (-32602).
    InvalidParams,
    /// Internal JSON-RPC error (-32603).
    InternalError,
    /// The referenced resource does not exist (-32002).
    ResourceNotFound,
    /// Any code outside the known set.
    Other(i32),
}

impl ErrorCode {
    /// The numeric wire value.
    #[must_use]
    pub const fn value(self) -> i32 {
        match self {
            Self::ParseError => -32700,
            Self::InvalidRequest => -32600,
            Self::MethodNotFound => -32601,
            Self::InvalidParams => -32602,
            Self::InternalError => -32603,
            Self::ResourceNotFound => -32002,
            Self::Other(code) => code,
        }
    }

    /// Whether the code sits in the reserved JSON-RPC protocol range.
    #[must_use]
    pub const fn is_protocol_error(self) -> bool {
        let code = self.value();
        code >= -32768 && code <= -32600
    }

    /// Whether the code sits in the implementation-defined server range.
    #[must_use]
    pub const fn is_server_error(self) -> bool {
        let code = self.value();
        code >= -32099 && code <= -32000
    }
}

impl From<i32> for ErrorCode {
    fn from(code: i32) -> Self {
        match code {
            -32700 => Self::ParseError,
            -32600 => Self::InvalidRequest,
            -32601 => Self::MethodNotFound,
            -32602 => Self::InvalidParams,
            -32603 => Self::InternalError,
            -32002 => Self::ResourceNotFound,
            other => Self::Other(other),
        }
    }
}

impl From<ErrorCode> for i32 {
    fn from(code: ErrorCode) -> Self {
        code.value()
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value())
    }
}

/// The error body of a failed response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorData {
    /// Error code.
    pub code: ErrorCode,
    /// Human-readable description.
    pub message: String,
    /// Optional structured detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl ErrorData {
    /// Create an error body without structured detail.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Attach structured detail.
    #[must_use]
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}

impl std::fmt::Display for ErrorData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_roundtrip() {
        let req = Request::with_params(
            "tools/call",
            7u64,
            serde_json::json!({"name": "echo", "arguments": {"text": "hi"}}),
        );
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("\"jsonrpc\":\"2.0\""));
        assert!(json.contains("\"id\":7"));

        let parsed: Message = serde_json::from_str(&json).unwrap();
        assert!(parsed.is_request());
        assert_eq!(parsed.method(), Some("tools/call"));
    }

    #[test]
    fn notification_has_no_id() {
        let n = Notification::new("notifications/initialized");
        let json = serde_json::to_string(&n).unwrap();
        assert!(!json.contains("\"id\""));

        let parsed: Message = serde_json::from_str(&json).unwrap();
        assert!(parsed.is_notification());
    }

    #[test]
    fn response_untagged_parse() {
        let json = r#"{"jsonrpc":"2.0","id":3,"result":{"tools":[]}}"#;
        let parsed: Message = serde_json::from_str(json).unwrap();
        assert!(parsed.is_response());

        let json = r#"{"jsonrpc":"2.0","id":"abc","error":{"code":-32601,"message":"nope"}}"#;
        let Message::Response(res) = serde_json::from_str::<Message>(json).unwrap() else {
            panic!("expected response");
        };
        assert!(res.is_error());
        let err = res.into_result().unwrap_err();
        assert_eq!(err.code, ErrorCode::MethodNotFound);
    }

    #[test]
    fn empty_response_body_is_internal_error() {
        let res = Response {
            jsonrpc: JSONRPC_VERSION.to_owned(),
            id: RequestId::Number(1),
            result: None,
            error: None,
        };
        let err = res.into_result().unwrap_err();
        assert_eq!(err.code, ErrorCode::InternalError);
    }

    #[test]
    fn error_code_wire_values() {
        assert_eq!(ErrorCode::ParseError.value(), -32700);
        assert_eq!(ErrorCode::ResourceNotFound.value(), -32002);
        assert_eq!(ErrorCode::from(-32601), ErrorCode::MethodNotFound);
        assert_eq!(ErrorCode::from(-32050), ErrorCode::Other(-32050));
    }

    #[test]
    fn error_code_categories() {
        assert!(ErrorCode::ParseError.is_protocol_error());
        assert!(!ErrorCode::ParseError.is_server_error());
        assert!(ErrorCode::Other(-32001).is_server_error());
        assert!(!ErrorCode::ResourceNotFound.is_server_error());
    }

    #[test]
    fn error_code_serializes_as_integer() {
        let data = ErrorData::new(ErrorCode::InvalidParams, "bad arguments")
            .with_data(serde_json::json!({"field": "name"}));
        let json = serde_json::to_value(&data).unwrap();
        assert_eq!(json["code"], -32602);
        assert_eq!(json["data"]["field"], "name");
    }
}
