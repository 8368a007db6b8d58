//! trainrun Server Library
//!
//! This crate provides job submission and progress tracking for trainrun:
//! the shared progress registry, progress queries with an artifact
//! fallback, and the HTTP surface over both.

pub mod artifacts;
pub mod config;
pub mod http;
pub mod query;
pub mod registry;
pub mod state;

pub use artifacts::{ArtifactStore, FsArtifactStore};
pub use config::Config;
pub use query::{ProgressQuery, ProgressReport, QueryError};
pub use registry::{Lookup, ProgressEntry, ProgressRegistry};
pub use state::AppState;
