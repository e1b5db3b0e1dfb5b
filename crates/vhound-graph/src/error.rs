//! Graph library error types.

use std::path::PathBuf;

use thiserror::Error;

/// Error that can occur while building or writing a graph.
#[derive(Debug, Error)]
pub enum GraphError {
    /// Reading or writing a graph file failed.
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for graph operations.
pub type GraphResult<T> = Result<T, GraphError>;
