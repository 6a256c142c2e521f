//! Error types for the DDNS updater
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for DDNS operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the DDNS updater
#[derive(Error, Debug)]
pub enum Error {
    /// Network or timeout failure talking to a remote service
    #[error("Transport error: {0}")]
    Transport(String),

    /// Zone or record name could not be resolved to a provider identifier
    #[error("Not found: {0}")]
    NotFound(String),

    /// Non-success status or malformed response from the DNS API
    #[error("DNS API error: {0}")]
    Api(String),

    /// Every IP-discovery endpoint failed
    #[error("Public IPv4 address is not available")]
    IpUnavailable,

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors (configuration files)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a DNS API error
    pub fn api(msg: impl Into<String>) -> Self {
        Self::Api(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether this error means the name was not resolvable
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        assert_eq!(
            Error::not_found("Zone not found: example.com").to_string(),
            "Not found: Zone not found: example.com"
        );
        assert_eq!(
            Error::IpUnavailable.to_string(),
            "Public IPv4 address is not available"
        );
    }

    #[test]
    fn test_anyhow_conversion() {
        let err: Error = anyhow::anyhow!("boom").into();
        assert!(matches!(err, Error::Other(ref m) if m == "boom"));
        assert!(!err.is_not_found());
    }
}
