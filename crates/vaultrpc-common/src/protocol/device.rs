//! Caller metadata attached to a request.
//!
//! [`DeviceInfo`] is supplied by the caller. [`Location`] is assigned by the
//! receiver from the caller's IP and never read from the wire.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Partial description of the calling device.
///
/// Every field is optional so that older and newer clients can both be
/// decoded. Unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeviceInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub os_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub browser: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime: Option<String>,
}

impl DeviceInfo {
    /// Version used to shape responses for this device, if it declared one.
    pub fn client_version(&self) -> Option<ClientVersion> {
        self.app_version.as_deref().and_then(ClientVersion::parse)
    }
}

/// Approximate location derived from the caller's IP address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
}

impl Location {
    pub fn new(country: impl Into<String>, city: impl Into<String>) -> Self {
        Self {
            country: Some(country.into()),
            city: Some(city.into()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.country.is_none() && self.city.is_none()
    }
}

/// Declared application version of a client, `major.minor.patch`.
///
/// Missing components default to zero and any pre-release or build suffix
/// (`3.1.0-beta.2`, `3.1.0+42`) is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl ClientVersion {
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self { major, minor, patch }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let core = raw
            .trim()
            .trim_start_matches('v')
            .split(['-', '+'])
            .next()?;
        let mut parts = core.split('.');
        let major = parts.next()?.parse().ok()?;
        let minor = match parts.next() {
            Some(part) => part.parse().ok()?,
            None => 0,
        };
        let patch = match parts.next() {
            Some(part) => part.parse().ok()?,
            None => 0,
        };
        if parts.next().is_some() {
            return None;
        }
        Some(Self { major, minor, patch })
    }
}

impl PartialOrd for ClientVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ClientVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch).cmp(&(other.major, other.minor, other.patch))
    }
}

impl fmt::Display for ClientVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_full_version() {
        assert_eq!(ClientVersion::parse("3.1.4"), Some(ClientVersion::new(3, 1, 4)));
    }

    #[test]
    fn test_parse_partial_and_suffixed_versions() {
        assert_eq!(ClientVersion::parse("4"), Some(ClientVersion::new(4, 0, 0)));
        assert_eq!(ClientVersion::parse("v2.5"), Some(ClientVersion::new(2, 5, 0)));
        assert_eq!(
            ClientVersion::parse("3.0.0-beta.2"),
            Some(ClientVersion::new(3, 0, 0))
        );
        assert_eq!(ClientVersion::parse("3.2.1+77"), Some(ClientVersion::new(3, 2, 1)));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(ClientVersion::parse(""), None);
        assert_eq!(ClientVersion::parse("latest"), None);
        assert_eq!(ClientVersion::parse("1.2.3.4"), None);
    }

    #[test]
    fn test_version_ordering() {
        assert!(ClientVersion::new(2, 9, 9) < ClientVersion::new(3, 0, 0));
        assert!(ClientVersion::new(3, 0, 1) > ClientVersion::new(3, 0, 0));
    }

    #[test]
    fn test_device_info_ignores_unknown_fields() {
        let device: DeviceInfo = serde_json::from_value(json!({
            "appVersion": "3.0.2",
            "platform": "linux",
            "screenDensity": 2
        }))
        .unwrap();
        assert_eq!(device.app_version.as_deref(), Some("3.0.2"));
        assert_eq!(device.client_version(), Some(ClientVersion::new(3, 0, 2)));
    }

    #[test]
    fn test_device_info_serializes_camel_case() {
        let device = DeviceInfo {
            os_version: Some("14".into()),
            ..Default::default()
        };
        assert_eq!(serde_json::to_value(&device).unwrap(), json!({"osVersion": "14"}));
    }
}
