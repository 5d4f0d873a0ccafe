//! Receiver configuration.
//!
//! Limits applied to untrusted inbound traffic, and the address to bind.

use std::net::SocketAddr;
use std::time::Duration;

/// Default cap on an inbound request body (1 GB).
pub const DEFAULT_MAX_REQUEST_SIZE: usize = 1_000_000_000;

/// Default time allowed for a geolocation lookup.
pub const DEFAULT_GEO_LOOKUP_TIMEOUT: Duration = Duration::from_secs(1);

/// Configuration for an [`HttpReceiver`](crate::HttpReceiver).
///
/// # Example
///
/// ```
/// use vaultrpc_server::ReceiverConfig;
/// use std::time::Duration;
///
/// let config = ReceiverConfig::new("127.0.0.1:0".parse().unwrap())
///     .with_max_request_size(1024 * 1024)
///     .with_geo_lookup_timeout(Duration::from_millis(200));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ReceiverConfig {
    /// Address the listener binds to
    pub bind_addr: SocketAddr,
    /// Largest accepted request body, in bytes
    pub max_request_size: usize,
    /// Deadline for the geolocation lookup of a single exchange
    pub geo_lookup_timeout: Duration,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            max_request_size: DEFAULT_MAX_REQUEST_SIZE,
            geo_lookup_timeout: DEFAULT_GEO_LOOKUP_TIMEOUT,
        }
    }
}

impl ReceiverConfig {
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            ..Self::default()
        }
    }

    pub fn with_max_request_size(mut self, max_request_size: usize) -> Self {
        self.max_request_size = max_request_size;
        self
    }

    pub fn with_geo_lookup_timeout(mut self, timeout: Duration) -> Self {
        self.geo_lookup_timeout = timeout;
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the request size cap is zero
    /// - the geolocation timeout is zero or longer than a minute
    pub fn validate(&self) -> Result<(), String> {
        if self.max_request_size == 0 {
            return Err("max request size must be greater than zero".to_string());
        }

        if self.geo_lookup_timeout.is_zero() {
            return Err("geolocation timeout must be greater than zero".to_string());
        }

        if self.geo_lookup_timeout > Duration::from_secs(60) {
            return Err(format!(
                "geolocation timeout must be <= 60 seconds (got {}ms)",
                self.geo_lookup_timeout.as_millis()
            ));
        }

        Ok(())
    }
}
