//! Error types for the proxy client.
//!
//! [`ProxyError`] is the internal fault taxonomy of an HTTP exchange. It is
//! converted into a [`ChatResult`] at the trait boundary, so callers never
//! see it as an `Err`.

use thiserror::Error;

use crate::types::ChatResult;

/// Result type alias using the proxy error type.
pub type Result<T> = std::result::Result<T, ProxyError>;

/// Error type for proxy operations.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// The proxy rejected the input or output under the active policy.
    #[error("Blocked by policy: {0}")]
    PolicyBlocked(String),

    /// The proxy or provider answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// The request exceeded its deadline.
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Network/connectivity error.
    #[error("Network error: {0}")]
    Network(String),

    /// A response arrived but could not be interpreted.
    #[error("Invalid response (HTTP {status}): {message}")]
    InvalidResponse { status: u16, message: String },

    /// The request could not be built from the given configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error (e.g. HTTP client construction).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<reqwest::Error> for ProxyError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProxyError::Timeout(err.to_string())
        } else if err.is_connect() {
            ProxyError::Network(format!("Connection failed: {}", err))
        } else {
            ProxyError::Network(err.to_string())
        }
    }
}

impl From<ProxyError> for ChatResult {
    fn from(err: ProxyError) -> Self {
        match err {
            ProxyError::PolicyBlocked(reason) => ChatResult::blocked(reason),
            ProxyError::Http { status, message } => ChatResult::upstream(Some(status), message),
            ProxyError::Timeout(_) => ChatResult::Timeout,
            ProxyError::InvalidResponse { status, message } => {
                ChatResult::upstream(Some(status), format!("invalid response: {}", message))
            }
            other @ (ProxyError::Network(_) | ProxyError::Config(_) | ProxyError::Internal(_)) => {
                ChatResult::upstream(None, other.to_string())
            }
        }
    }
}
