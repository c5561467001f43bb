//! JSON-RPC 2.0 message types for the MCP wire protocol.
//!
//! Three message kinds flow over the channel:
//!
//! - **Request**: carries an `id`; receives exactly one response with the
//!   same `id`, whenever that response becomes available
//! - **Notification**: no `id`, never answered
//! - **Response**: success (`result`) or error (`error` with code/message)
//!
//! Ids are strings or integers, never `null`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The MCP protocol version this implementation supports.
pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";

/// Server name for capability negotiation.
pub const SERVER_NAME: &str = "video-downloader-mcp";

/// A JSON-RPC 2.0 request ID: string or integer, never `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// Numeric request ID.
    Number(i64),
    /// String request ID.
    String(String),
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s}"),
        }
    }
}

/// An incoming request expecting exactly one response.
#[derive(Debug, Clone, Deserialize)]
pub struct Request {
    /// Must be "2.0".
    pub jsonrpc: String,
    /// Unique request identifier.
    pub id: RequestId,
    /// The method to invoke.
    pub method: String,
    /// Optional parameters for the method.
    #[serde(default)]
    pub params: Option<Value>,
}

/// An incoming notification: no id, no response.
#[derive(Debug, Clone, Deserialize)]
pub struct Notification {
    /// Must be "2.0".
    pub jsonrpc: String,
    /// The notification method.
    pub method: String,
    /// Optional parameters for the notification.
    #[serde(default)]
    pub params: Option<Value>,
}

/// A successful response.
#[derive(Debug, Clone, Serialize)]
pub struct Response {
    /// Always "2.0".
    pub jsonrpc: &'static str,
    /// The request ID this response answers.
    pub id: RequestId,
    /// The result of the method call.
    pub result: Value,
}

impl Response {
    /// Creates a success response.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // Value is not const-compatible
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result,
        }
    }
}

/// Standard JSON-RPC 2.0 error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Invalid JSON was received by the server.
    ParseError,
    /// The JSON sent is not a valid Request object.
    InvalidRequest,
    /// The method does not exist or is not available.
    MethodNotFound,
    /// Invalid method parameters.
    InvalidParams,
    /// Internal JSON-RPC error.
    InternalError,
}

impl ErrorCode {
    /// Returns the numeric code for this error.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::ParseError => -32700,
            Self::InvalidRequest => -32600,
            Self::MethodNotFound => -32601,
            Self::InvalidParams => -32602,
            Self::InternalError => -32603,
        }
    }
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorObject {
    /// The error code.
    pub code: i32,
    /// A short description of the error.
    pub message: String,
}

/// An error response.
///
/// These answer *transport-level* problems only: malformed JSON, unknown
/// methods, invalid params. Tool failures travel as successful responses
/// with an error content block instead.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Always "2.0".
    pub jsonrpc: &'static str,
    /// The request ID this error answers, when one could be recovered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<RequestId>,
    /// The error details.
    pub error: ErrorObject,
}

impl ErrorResponse {
    /// Creates an error response with a custom message.
    #[must_use]
    pub fn new(id: Option<RequestId>, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            error: ErrorObject {
                code: code.code(),
                message: message.into(),
            },
        }
    }

    /// Parse error: the input was not valid JSON, so no id is available.
    #[must_use]
    pub fn parse_error() -> Self {
        Self::new(None, ErrorCode::ParseError, "Parse error")
    }

    /// The JSON was well-formed but not a valid JSON-RPC message.
    #[must_use]
    pub fn invalid_request(id: Option<RequestId>) -> Self {
        Self::new(id, ErrorCode::InvalidRequest, "Invalid Request")
    }

    /// The requested method is not registered.
    #[must_use]
    pub fn method_not_found(id: RequestId, method: &str) -> Self {
        Self::new(
            Some(id),
            ErrorCode::MethodNotFound,
            format!("Method not found: {method}"),
        )
    }

    /// The method parameters were missing or malformed.
    #[must_use]
    pub fn invalid_params(id: RequestId, message: impl Into<String>) -> Self {
        Self::new(Some(id), ErrorCode::InvalidParams, message)
    }

    /// Something failed server-side that is not the client's fault.
    #[must_use]
    pub fn internal_error(id: RequestId, message: impl Into<String>) -> Self {
        Self::new(Some(id), ErrorCode::InternalError, message)
    }
}

/// An incoming message: request or notification, told apart by the presence
/// of an `id` field.
#[derive(Debug, Clone)]
pub enum IncomingMessage {
    /// A request expecting a response.
    Request(Request),
    /// A notification (no response expected).
    Notification(Notification),
}

/// Parses one line into an incoming message.
///
/// # Errors
///
/// Returns the [`ErrorResponse`] to send back when the line is malformed.
/// An id is recovered whenever the input was at least valid JSON with an
/// `id` member, so the client can pair the error with its request.
pub fn parse_message(json: &str) -> Result<IncomingMessage, ErrorResponse> {
    let value: Value = serde_json::from_str(json).map_err(|_| ErrorResponse::parse_error())?;

    let obj = value.as_object().ok_or_else(ErrorResponse::parse_error)?;

    // Recover the id early so validation failures can still carry it.
    let id: Option<RequestId> = obj
        .get("id")
        .cloned()
        .and_then(|v| serde_json::from_value(v).ok());

    let version_ok = obj.get("jsonrpc").and_then(Value::as_str) == Some("2.0");
    if !version_ok {
        return Err(ErrorResponse::invalid_request(id));
    }

    if obj.contains_key("id") {
        let request: Request = serde_json::from_value(value)
            .map_err(|_| ErrorResponse::invalid_request(id.clone()))?;
        if request.method.is_empty() {
            return Err(ErrorResponse::invalid_request(Some(request.id)));
        }
        Ok(IncomingMessage::Request(request))
    } else {
        let notification: Notification =
            serde_json::from_value(value).map_err(|_| ErrorResponse::invalid_request(None))?;
        Ok(IncomingMessage::Notification(notification))
    }
}
