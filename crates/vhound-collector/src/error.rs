//! Collector error types.
//!
//! The taxonomy distinguishes failures that are fatal for one source from
//! partial failures that reduce completeness only. "Value intentionally
//! absent" conditions (empty principal fragments, no-access roles) are not
//! errors at all and never reach these types.

use thiserror::Error;

/// Error that can occur while collecting from a source.
#[derive(Debug, Error)]
pub enum CollectorError {
    /// Transport failure reaching the source. Fatal for this source only.
    #[error("connection failed: {message}")]
    ConnectionFailed {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The source rejected the supplied credentials. Fatal for this source.
    #[error("authentication failed: invalid credentials for {username}@{host}")]
    AuthenticationFailed { host: String, username: String },

    /// A subtree or single-object property fetch failed. The object is
    /// skipped, siblings proceed, placeholders already created are kept.
    #[error("partial collection failure on {object}: {message}")]
    PartialCollection { object: String, message: String },

    /// A single directory membership query failed. Reduces membership-edge
    /// completeness only.
    #[error("directory query failed for group '{group}' in domain '{domain}': {message}")]
    DirectoryQuery {
        group: String,
        domain: String,
        message: String,
    },

    /// The source returned something the protocol layer could not interpret.
    #[error("protocol error: {message}")]
    Protocol { message: String },

    /// Source configuration is invalid.
    #[error("invalid configuration: {message}")]
    InvalidConfiguration { message: String },
}

impl CollectorError {
    /// Whether this error aborts collection from the whole source, as
    /// opposed to skipping one object or query.
    pub fn is_fatal_for_source(&self) -> bool {
        matches!(
            self,
            CollectorError::ConnectionFailed { .. }
                | CollectorError::AuthenticationFailed { .. }
                | CollectorError::InvalidConfiguration { .. }
        )
    }

    /// Create a connection failed error.
    pub fn connection_failed(message: impl Into<String>) -> Self {
        CollectorError::ConnectionFailed {
            message: message.into(),
            source: None,
        }
    }

    /// Create a connection failed error with source.
    pub fn connection_failed_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        CollectorError::ConnectionFailed {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a partial collection error.
    pub fn partial(object: impl Into<String>, message: impl Into<String>) -> Self {
        CollectorError::PartialCollection {
            object: object.into(),
            message: message.into(),
        }
    }

    /// Create a protocol error.
    pub fn protocol(message: impl Into<String>) -> Self {
        CollectorError::Protocol {
            message: message.into(),
        }
    }
}

/// Result type for collector operations.
pub type CollectorResult<T> = Result<T, CollectorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatality_classification() {
        assert!(CollectorError::connection_failed("down").is_fatal_for_source());
        assert!(CollectorError::AuthenticationFailed {
            host: "vc01".into(),
            username: "svc".into(),
        }
        .is_fatal_for_source());
        assert!(!CollectorError::partial("vm-1", "timeout").is_fatal_for_source());
        assert!(!CollectorError::DirectoryQuery {
            group: "g".into(),
            domain: "d".into(),
            message: "m".into(),
        }
        .is_fatal_for_source());
    }
}
