//! Error taxonomy shared by senders, receivers and handlers.
//!
//! Errors never cross the wire as native values. They are flattened into an
//! [`ErrorInfo`] (`code` + `message` + optional `data`) and carried inside a
//! [`Response`](super::Response).

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::hash::{Hash, Hasher};
use thiserror::Error;

/// Error code carried in an error response.
///
/// The transport codes form a closed set. Codes raised by the application
/// handler are passed through untouched as [`ErrorCode::Application`].
///
/// Two codes are equal when their wire strings are equal, so an
/// `Application` code spelled like a transport code compares equal to that
/// transport code, matching what a decode of the wire form yields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ErrorCode {
    /// The payload could not be decoded into a request or response
    MalformedPayload,
    /// The request body exceeded the receiver's size cap
    MaxRequestSizeExceeded,
    /// The HTTP method is neither the preflight nor the call verb
    MethodNotAllowed,
    /// Unexpected failure on the remote side, or an undecodable reply
    ServerError,
    /// The server could not be reached
    FailedConnection,
    /// The call did not complete before its deadline
    Timeout,
    /// Application-defined code returned by a handler
    Application(String),
}

impl ErrorCode {
    /// Builds an application code, mapping reserved transport strings to
    /// their transport variant.
    pub fn application(code: impl Into<String>) -> Self {
        ErrorCode::from(code.into())
    }

    /// Returns the wire representation of this code.
    pub fn as_str(&self) -> &str {
        match self {
            ErrorCode::MalformedPayload => "malformed_payload",
            ErrorCode::MaxRequestSizeExceeded => "max_request_size_exceeded",
            ErrorCode::MethodNotAllowed => "method_not_allowed",
            ErrorCode::ServerError => "server_error",
            ErrorCode::FailedConnection => "failed_connection",
            ErrorCode::Timeout => "timeout",
            ErrorCode::Application(code) => code,
        }
    }

    /// Whether this code belongs to the server-error class.
    ///
    /// Connectivity problems are reported in this class so that callers can
    /// apply one retry policy to all of them.
    pub fn is_server_class(&self) -> bool {
        matches!(
            self,
            ErrorCode::ServerError | ErrorCode::FailedConnection | ErrorCode::Timeout
        )
    }
}

impl From<String> for ErrorCode {
    fn from(code: String) -> Self {
        match code.as_str() {
            "malformed_payload" => ErrorCode::MalformedPayload,
            "max_request_size_exceeded" => ErrorCode::MaxRequestSizeExceeded,
            "method_not_allowed" => ErrorCode::MethodNotAllowed,
            "server_error" => ErrorCode::ServerError,
            "failed_connection" => ErrorCode::FailedConnection,
            "timeout" => ErrorCode::Timeout,
            _ => ErrorCode::Application(code),
        }
    }
}

impl PartialEq for ErrorCode {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for ErrorCode {}

impl Hash for ErrorCode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_str().hash(state);
    }
}

impl From<&str> for ErrorCode {
    fn from(code: &str) -> Self {
        ErrorCode::from(code.to_string())
    }
}

impl From<ErrorCode> for String {
    fn from(code: ErrorCode) -> Self {
        match code {
            ErrorCode::Application(code) => code,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error object as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Machine-readable error code
    pub code: ErrorCode,
    /// Human-readable description
    pub message: String,
    /// Optional structured context. An explicit `null` is kept as
    /// `Some(Value::Null)`.
    #[serde(
        default,
        deserialize_with = "super::responses::present",
        skip_serializing_if = "Option::is_none"
    )]
    pub data: Option<Value>,
}

impl ErrorInfo {
    pub fn new(code: impl Into<ErrorCode>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

#[derive(Error, Debug)]
pub enum VaultRpcError {
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Max request size exceeded: received {received} bytes (max {limit} bytes)")]
    MaxRequestSizeExceeded { limit: usize, received: usize },

    #[error("Method not allowed: {0}")]
    MethodNotAllowed(String),

    #[error("Server error: {message}")]
    ServerError { message: String, data: Option<Value> },

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl VaultRpcError {
    /// Maps the error onto its wire code.
    pub fn code(&self) -> ErrorCode {
        match self {
            VaultRpcError::MalformedPayload(_) => ErrorCode::MalformedPayload,
            VaultRpcError::MaxRequestSizeExceeded { .. } => ErrorCode::MaxRequestSizeExceeded,
            VaultRpcError::MethodNotAllowed(_) => ErrorCode::MethodNotAllowed,
            VaultRpcError::Connection(_) => ErrorCode::FailedConnection,
            VaultRpcError::Timeout(_) => ErrorCode::Timeout,
            VaultRpcError::ServerError { .. }
            | VaultRpcError::InvalidUrl(_)
            | VaultRpcError::Transport(_)
            | VaultRpcError::Io(_) => ErrorCode::ServerError,
        }
    }

    /// Whether a caller may reasonably retry the same call.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            VaultRpcError::Connection(_) | VaultRpcError::Timeout(_)
        )
    }

    /// Flattens the error into its wire form.
    pub fn to_error_info(&self) -> ErrorInfo {
        let info = ErrorInfo::new(self.code(), self.to_string());
        match self {
            VaultRpcError::ServerError { data: Some(data), .. } => info.with_data(data.clone()),
            VaultRpcError::MaxRequestSizeExceeded { limit, received } => {
                info.with_data(json!({ "limit": limit, "received": received }))
            }
            _ => info,
        }
    }
}

impl From<serde_json::Error> for VaultRpcError {
    fn from(err: serde_json::Error) -> Self {
        VaultRpcError::MalformedPayload(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, VaultRpcError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_wire_strings() {
        assert_eq!(ErrorCode::MalformedPayload.as_str(), "malformed_payload");
        assert_eq!(
            ErrorCode::MaxRequestSizeExceeded.as_str(),
            "max_request_size_exceeded"
        );
        assert_eq!(ErrorCode::MethodNotAllowed.as_str(), "method_not_allowed");
        assert_eq!(ErrorCode::ServerError.as_str(), "server_error");
    }

    #[test]
    fn test_application_code_passes_through() {
        let code = ErrorCode::from("insufficient_permissions");
        assert_eq!(code, ErrorCode::Application("insufficient_permissions".into()));

        let serialized = serde_json::to_string(&code).unwrap();
        assert_eq!(serialized, r#""insufficient_permissions""#);
    }

    #[test]
    fn test_known_code_deserializes_to_variant() {
        let code: ErrorCode = serde_json::from_str(r#""server_error""#).unwrap();
        assert_eq!(code, ErrorCode::ServerError);
    }

    #[test]
    fn test_application_constructor_normalizes_reserved_codes() {
        assert_eq!(ErrorCode::application("server_error"), ErrorCode::ServerError);
        assert!(matches!(ErrorCode::application("timeout"), ErrorCode::Timeout));
        assert!(matches!(
            ErrorCode::application("vault_locked"),
            ErrorCode::Application(_)
        ));
    }

    #[test]
    fn test_codes_compare_by_wire_string() {
        use std::collections::HashSet;

        let spelled = ErrorCode::Application("server_error".to_string());
        assert_eq!(spelled, ErrorCode::ServerError);
        assert_ne!(spelled, ErrorCode::Timeout);

        let set: HashSet<ErrorCode> = [spelled, ErrorCode::ServerError].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_connectivity_errors_are_server_class_and_retryable() {
        let refused = VaultRpcError::Connection("connection refused".into());
        assert!(refused.is_retryable());
        assert!(refused.code().is_server_class());

        let timeout = VaultRpcError::Timeout(30_000);
        assert!(timeout.is_retryable());
        assert!(timeout.code().is_server_class());

        let malformed = VaultRpcError::MalformedPayload("eof".into());
        assert!(!malformed.is_retryable());
        assert!(!malformed.code().is_server_class());
    }

    #[test]
    fn test_server_error_keeps_data() {
        let err = VaultRpcError::ServerError {
            message: "bad body".into(),
            data: Some(json!({"error": "expected value"})),
        };
        let info = err.to_error_info();
        assert_eq!(info.code, ErrorCode::ServerError);
        assert_eq!(info.data, Some(json!({"error": "expected value"})));
    }

    #[test]
    fn test_size_error_reports_limit() {
        let err = VaultRpcError::MaxRequestSizeExceeded { limit: 10, received: 12 };
        let info = err.to_error_info();
        assert_eq!(info.code, ErrorCode::MaxRequestSizeExceeded);
        assert_eq!(info.data, Some(json!({"limit": 10, "received": 12})));
    }
}
