//! Sender configuration.

use std::time::Duration;

/// Default deadline for one exchange.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default cap on a response body (1 GB).
pub const DEFAULT_MAX_RESPONSE_SIZE: usize = 1_000_000_000;

/// Configuration for an [`HttpSender`](crate::HttpSender).
#[derive(Debug, Clone, PartialEq)]
pub struct SenderConfig {
    /// Deadline covering connect, write and the full response read
    pub timeout: Duration,
    /// Largest accepted response body, in bytes
    pub max_response_size: usize,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            max_response_size: DEFAULT_MAX_RESPONSE_SIZE,
        }
    }
}

impl SenderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_response_size(mut self, max_response_size: usize) -> Self {
        self.max_response_size = max_response_size;
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the timeout or the response size cap is zero.
    pub fn validate(&self) -> Result<(), String> {
        if self.timeout.is_zero() {
            return Err("timeout must be greater than zero".to_string());
        }

        if self.max_response_size == 0 {
            return Err("max response size must be greater than zero".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SenderConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.max_response_size, 1_000_000_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate() {
        assert!(SenderConfig::new().with_timeout(Duration::ZERO).validate().is_err());
        assert!(SenderConfig::new().with_max_response_size(0).validate().is_err());
        assert!(SenderConfig::new()
            .with_timeout(Duration::from_millis(1))
            .with_max_response_size(1)
            .validate()
            .is_ok());
    }
}
