//! vaultrpc Response Types
//!
//! A response is either a result or an error, never both and never neither.
//! The Rust type enforces that directly; the wire shape is checked on decode.
//!
//! # Wire format
//!
//! ```text
//! {"result": <any JSON value, null included>}
//! {"error": {"code": "...", "message": "...", "data": <optional>}}
//! ```

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use super::device::ClientVersion;
use super::error::{ErrorCode, ErrorInfo, VaultRpcError};

/// RPC method result (JSON value)
pub type RpcResult = Value;

/// First client version that understands `error.data`.
pub const STRUCTURED_ERROR_DATA_SINCE: ClientVersion = ClientVersion::new(3, 0, 0);

/// The reply to a single request.
///
/// # Example
///
/// ```
/// use vaultrpc_common::protocol::Response;
/// use serde_json::json;
///
/// let ok = Response::success(json!({"pong": true}));
/// assert!(ok.is_success());
///
/// let failed = Response::error("not_found", "Vault not found");
/// assert!(failed.as_error().is_some());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// Successful outcome carrying the handler's result
    Result(RpcResult),
    /// Failed outcome carrying a structured error
    Error(ErrorInfo),
}

impl Response {
    pub fn success(result: RpcResult) -> Self {
        Response::Result(result)
    }

    pub fn error(code: impl Into<ErrorCode>, message: impl Into<String>) -> Self {
        Response::Error(ErrorInfo::new(code, message))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Response::Result(_))
    }

    pub fn as_result(&self) -> Option<&RpcResult> {
        match self {
            Response::Result(result) => Some(result),
            Response::Error(_) => None,
        }
    }

    pub fn as_error(&self) -> Option<&ErrorInfo> {
        match self {
            Response::Result(_) => None,
            Response::Error(error) => Some(error),
        }
    }

    /// Converts into a plain `Result`, handy for callers that use `?`.
    pub fn into_result(self) -> std::result::Result<RpcResult, ErrorInfo> {
        match self {
            Response::Result(result) => Ok(result),
            Response::Error(error) => Err(error),
        }
    }

    /// Projects the response onto the shape understood by `client_version`.
    ///
    /// Clients older than [`STRUCTURED_ERROR_DATA_SINCE`] do not get
    /// `error.data`. An unknown version gets the full shape.
    pub fn to_wire(&self, client_version: Option<ClientVersion>) -> Response {
        match (self, client_version) {
            (Response::Error(error), Some(version)) if version < STRUCTURED_ERROR_DATA_SINCE => {
                Response::Error(ErrorInfo {
                    data: None,
                    ..error.clone()
                })
            }
            _ => self.clone(),
        }
    }
}

impl From<VaultRpcError> for Response {
    fn from(err: VaultRpcError) -> Self {
        Response::Error(err.to_error_info())
    }
}

impl From<ErrorInfo> for Response {
    fn from(error: ErrorInfo) -> Self {
        Response::Error(error)
    }
}

/// Unchecked wire shape of a response, as decoded.
#[derive(Deserialize)]
struct RawResponse {
    // `null` is a legitimate result, so presence is tracked separately from
    // the value itself.
    #[serde(default, deserialize_with = "present")]
    result: Option<Value>,
    #[serde(default)]
    error: Option<ErrorInfo>,
}

#[derive(Serialize)]
struct RawResponseRef<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a ErrorInfo>,
}

/// Treats a field that is present on the wire as `Some`, even when it is
/// `null`. Pair with `#[serde(default)]` so that an absent field stays `None`.
pub(crate) fn present<'de, D>(deserializer: D) -> std::result::Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl Serialize for Response {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let raw = RawResponseRef {
            result: self.as_result(),
            error: self.as_error(),
        };
        raw.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Response {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = RawResponse::deserialize(deserializer)?;
        match (raw.result, raw.error) {
            (Some(result), None) => Ok(Response::Result(result)),
            (None, Some(error)) => Ok(Response::Error(error)),
            (Some(_), Some(_)) => Err(de::Error::custom(
                "response carries both result and error",
            )),
            (None, None) => Err(de::Error::custom(
                "response carries neither result nor error",
            )),
        }
    }
}
