//! Per-connection tunables.
//!
//! [`ConnParams`] holds the two knobs a connection exposes: how large a
//! single inbound message may be and how long a single outbound write may
//! take. One instance is shared read-only by every connection a
//! [`Websocket`](crate::Websocket) serves.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use ws_rpc_bridge::ConnParams;
//!
//! let params = ConnParams::new()
//!     .with_read_limit(1024 * 1024)
//!     .with_write_timeout(Duration::from_secs(2));
//! params.validate()?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use serde::Deserialize;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Default maximum size of one inbound message (32 MiB).
pub const DEFAULT_READ_LIMIT: usize = 32 * 1024 * 1024;

/// Default maximum duration of one outbound write.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// ConnParams
// ============================================================================

/// Connection parameters.
///
/// Deserializes from `{"read_limit": ..., "write_timeout_ms": ...}`; missing
/// fields take their defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ConnParams {
    /// Maximum number of bytes accepted in a single inbound message.
    pub read_limit: usize,

    /// Maximum time allowed to complete one outbound write.
    #[serde(rename = "write_timeout_ms", with = "duration_ms")]
    pub write_timeout: Duration,
}

impl Default for ConnParams {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl ConnParams {
    /// Creates parameters with the default limits.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            read_limit: DEFAULT_READ_LIMIT,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl ConnParams {
    /// Sets the inbound message size ceiling in bytes.
    #[inline]
    #[must_use]
    pub fn with_read_limit(mut self, bytes: usize) -> Self {
        self.read_limit = bytes;
        self
    }

    /// Sets the outbound write deadline.
    #[inline]
    #[must_use]
    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }
}

// ============================================================================
// Validation & Conversion
// ============================================================================

impl ConnParams {
    /// Checks that both limits are strictly positive.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if either limit is zero.
    pub fn validate(&self) -> Result<()> {
        if self.read_limit == 0 {
            return Err(Error::config("read_limit must be greater than zero"));
        }

        if self.write_timeout.is_zero() {
            return Err(Error::config("write_timeout must be greater than zero"));
        }

        Ok(())
    }

    /// Returns the write deadline in whole milliseconds.
    #[inline]
    #[must_use]
    pub fn write_timeout_ms(&self) -> u64 {
        u64::try_from(self.write_timeout.as_millis()).unwrap_or(u64::MAX)
    }

    /// Builds the transport configuration enforcing the read ceiling.
    ///
    /// A single frame may carry a whole message, so the frame ceiling is
    /// raised to match.
    #[must_use]
    pub fn ws_config(&self) -> WebSocketConfig {
        WebSocketConfig::default()
            .max_message_size(Some(self.read_limit))
            .max_frame_size(Some(self.read_limit))
    }
}

// ============================================================================
// Serde Helpers
// ============================================================================

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let params = ConnParams::default();
        assert_eq!(params.read_limit, 32 * 1024 * 1024);
        assert_eq!(params.write_timeout, Duration::from_secs(5));
        assert_eq!(params.write_timeout_ms(), 5000);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_builder_methods() {
        let params = ConnParams::new()
            .with_read_limit(1024)
            .with_write_timeout(Duration::from_millis(250));

        assert_eq!(params.read_limit, 1024);
        assert_eq!(params.write_timeout_ms(), 250);
    }

    #[test]
    fn test_write_timeout_ms_saturates() {
        let params = ConnParams::new().with_write_timeout(Duration::MAX);
        assert_eq!(params.write_timeout_ms(), u64::MAX);
    }

    #[test]
    fn test_zero_read_limit_rejected() {
        let err = ConnParams::new().with_read_limit(0).validate().unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
        assert!(err.to_string().contains("read_limit"));
    }

    #[test]
    fn test_zero_write_timeout_rejected() {
        let err = ConnParams::new()
            .with_write_timeout(Duration::ZERO)
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("write_timeout"));
    }

    #[test]
    fn test_deserialize_partial() {
        let params: ConnParams = serde_json::from_str(r#"{"write_timeout_ms": 1500}"#).unwrap();
        assert_eq!(params.read_limit, DEFAULT_READ_LIMIT);
        assert_eq!(params.write_timeout, Duration::from_millis(1500));
    }

    #[test]
    fn test_deserialize_full() {
        let params: ConnParams =
            serde_json::from_str(r#"{"read_limit": 4096, "write_timeout_ms": 10}"#).unwrap();
        let expected = ConnParams::new()
            .with_read_limit(4096)
            .with_write_timeout(Duration::from_millis(10));
        assert_eq!(params, expected);
    }

    #[test]
    fn test_ws_config_limits() {
        let config = ConnParams::new().with_read_limit(2048).ws_config();
        assert_eq!(config.max_message_size, Some(2048));
        assert_eq!(config.max_frame_size, Some(2048));
    }
}
