//! Core domain errors.

use thiserror::Error;

/// Core domain errors for trainrun.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Job kind string was not one of the known kinds.
    #[error("Invalid job kind '{0}': expected 'training' or 'generation'")]
    InvalidJobKind(String),

    /// Job id is empty or could escape the artifact directories.
    #[error("Invalid job id '{0}'")]
    InvalidJobId(String),
}
