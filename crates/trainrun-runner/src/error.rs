//! Error types for the job runner.

use thiserror::Error;

/// Errors that can occur while launching or talking to an external job.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// The job program could not be started.
    #[error("Failed to start training process '{program}': {source}. Check that it is installed correctly.")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// I/O error on the child's pipes.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Protocol error during communication.
    #[error("Protocol error: {0}")]
    Protocol(String),
}
