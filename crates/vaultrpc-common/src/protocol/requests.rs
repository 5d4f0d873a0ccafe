use serde::{Deserialize, Serialize};

use super::device::{ClientVersion, DeviceInfo, Location};

pub type MethodName = String;
pub type RpcParams = serde_json::Value;

/// A single RPC call.
///
/// `ip_address` and `location` belong to the receiver: they are never
/// serialized and never decoded, so a caller cannot forge them through the
/// payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub method: MethodName,
    #[serde(default)]
    pub params: RpcParams,
    /// Opaque authentication blob, forwarded to the handler as-is
    #[serde(
        default,
        deserialize_with = "super::responses::present",
        skip_serializing_if = "Option::is_none"
    )]
    pub auth: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<DeviceInfo>,
    #[serde(skip)]
    pub ip_address: Option<String>,
    #[serde(skip)]
    pub location: Option<Location>,
}

impl Request {
    pub fn new(method: impl Into<String>, params: RpcParams) -> Self {
        Request {
            method: method.into(),
            params,
            ..Default::default()
        }
    }

    pub fn with_device(mut self, device: DeviceInfo) -> Self {
        self.device = Some(device);
        self
    }

    pub fn with_auth(mut self, auth: serde_json::Value) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Version the response should be shaped for.
    pub fn client_version(&self) -> Option<ClientVersion> {
        self.device.as_ref().and_then(DeviceInfo::client_version)
    }
}
