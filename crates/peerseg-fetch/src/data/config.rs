use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Per-load timing and retry policy.
///
/// Durations serialize as whole milliseconds (`timeout_ms`, `retry_delay_ms`,
/// `max_retry_delay_ms`) so that the type reads naturally from TOML or
/// environment variables.
///
/// # Examples
///
/// ```
/// use peerseg_fetch::FetchConfig;
/// use std::time::Duration;
///
/// let config = FetchConfig::default()
///     .timeout(Duration::from_secs(5))
///     .max_retries(2);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Upper bound for each phase of an HTTP attempt: waiting for headers, then
    /// receiving the body.
    ///
    /// Default: 10s
    #[serde(rename = "timeout_ms", with = "millis")]
    pub timeout: Duration,

    /// Delay before the first retry.
    ///
    /// Default: 1s
    #[serde(rename = "retry_delay_ms", with = "millis")]
    pub retry_delay: Duration,

    /// Number of retried failures allowed before the next failure is terminal.
    ///
    /// - Total attempts = 1 (initial) + max_retries
    /// - 4xx responses are never retried
    ///
    /// Default: 3
    pub max_retries: u32,

    /// Cap for the doubling retry delay.
    ///
    /// Default: 64s
    #[serde(rename = "max_retry_delay_ms", with = "millis")]
    pub max_retry_delay: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            retry_delay: Duration::from_secs(1),
            max_retries: 3,
            max_retry_delay: Duration::from_secs(64),
        }
    }
}

impl FetchConfig {
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    #[must_use]
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    #[must_use]
    pub fn max_retry_delay(mut self, max_retry_delay: Duration) -> Self {
        self.max_retry_delay = max_retry_delay;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.max_retry_delay < self.retry_delay {
            return Err(ConfigError::RetryDelayCap {
                initial_ms: self.retry_delay.as_millis() as u64,
                max_ms: self.max_retry_delay.as_millis() as u64,
            });
        }
        Ok(())
    }
}

/// Where the HTTP fallback lives and which directory the segments belong to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Base URL of the HTTP gateway, e.g. `http://localhost:9090`.
    pub url: String,

    /// Content hash of the directory that holds the stream's segments.
    pub root: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:9090".to_string(),
            root: String::new(),
        }
    }
}

impl GatewayConfig {
    pub fn new(url: impl Into<String>, root: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            root: root.into(),
        }
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
