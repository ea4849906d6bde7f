//! Error types for peerseg-fetch.

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("peer-store error: {0}")]
    PeerStore(String),

    #[error("file not found: {root}/{name}")]
    NotInListing { root: String, name: String },

    #[error("body stream failed after {received} bytes: {message}")]
    Stream { received: u64, message: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("timeout must be greater than zero")]
    ZeroTimeout,

    #[error("max retry delay ({max_ms}ms) is shorter than the initial retry delay ({initial_ms}ms)")]
    RetryDelayCap { initial_ms: u64, max_ms: u64 },
}

pub type Result<T> = std::result::Result<T, FetchError>;

/// Error shape handed to the streaming engine.
///
/// `code` carries the HTTP status when one was received and `0` otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoaderError {
    pub code: u16,
    pub text: String,
}

impl LoaderError {
    pub fn from_status(status: u16, text: impl Into<String>) -> Self {
        Self {
            code: status,
            text: text.into(),
        }
    }
}

impl From<&FetchError> for LoaderError {
    fn from(err: &FetchError) -> Self {
        Self {
            code: 0,
            text: err.to_string(),
        }
    }
}

impl std::fmt::Display for LoaderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.text, self.code)
    }
}
