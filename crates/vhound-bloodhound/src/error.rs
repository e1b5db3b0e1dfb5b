//! BloodHound client error types.

use thiserror::Error;

/// Error that can occur while talking to the BloodHound API.
#[derive(Debug, Error)]
pub enum BloodHoundError {
    /// The request signature could not be computed.
    #[error("request signing failed: {message}")]
    Signing { message: String },

    /// The API answered with a non-success status.
    #[error("api error: {status} {message}")]
    Api { status: u16, message: String },

    /// Transport-level failure reaching the API.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Client configuration is invalid.
    #[error("invalid configuration: {message}")]
    InvalidConfiguration { message: String },
}

impl BloodHoundError {
    /// Create a signing error.
    pub fn signing(message: impl Into<String>) -> Self {
        BloodHoundError::Signing {
            message: message.into(),
        }
    }

    /// Create an invalid configuration error.
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        BloodHoundError::InvalidConfiguration {
            message: message.into(),
        }
    }
}

/// Result type for BloodHound operations.
pub type BloodHoundResult<T> = Result<T, BloodHoundError>;
