//! CLI error types and exit codes.

use thiserror::Error;
use vhound_bloodhound::BloodHoundError;
use vhound_collector::CollectorError;
use vhound_graph::GraphError;

/// Exit codes for the CLI
/// - 0: Success
/// - 1: General error
/// - 2: Authentication failed
/// - 3: Network error
/// - 4: Validation error
pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Collector(#[from] CollectorError),

    #[error("{0}")]
    Graph(#[from] GraphError),

    #[error("{0}")]
    BloodHound(#[from] BloodHoundError),

    #[error("Invalid input: {0}")]
    Validation(String),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Collector(CollectorError::AuthenticationFailed { .. }) => 2,
            CliError::Collector(CollectorError::ConnectionFailed { .. })
            | CliError::BloodHound(BloodHoundError::Network(_))
            | CliError::BloodHound(BloodHoundError::Api { .. }) => 3,
            CliError::Validation(_)
            | CliError::Collector(CollectorError::InvalidConfiguration { .. })
            | CliError::BloodHound(BloodHoundError::InvalidConfiguration { .. }) => 4,
            _ => 1,
        }
    }

    pub fn print(&self) {
        eprintln!("Error: {self}");
    }
}
