//! trainrun Core Domain Types
//!
//! This crate contains pure domain types with no dependencies on:
//! - Child processes
//! - Network/HTTP
//! - Runtime specifics
//!
//! All types here describe a training job, its progress and its outcome.

pub mod error;
pub mod ids;
pub mod job;
pub mod limits;
pub mod outcome;
pub mod status;

// Re-export commonly used types
pub use error::CoreError;
pub use ids::JobId;
pub use job::{JobArgs, JobPaths, JobRequest, DEFAULT_BATCH_SIZE, DEFAULT_EPOCHS};
pub use outcome::{Artifacts, FailureCategory, FailureSource, JobOutcome, Metrics};
pub use status::{JobKind, ProgressStatus};
