//! Shared application state.

use std::sync::Arc;

use trainrun_runner::JobLauncher;

use crate::artifacts::FsArtifactStore;
use crate::config::Config;
use crate::query::ProgressQuery;
use crate::registry::ProgressRegistry;

/// Shared application state.
pub struct AppState {
    /// Live progress of running jobs.
    pub registry: Arc<ProgressRegistry>,

    /// Read side over the registry and finished artifacts.
    pub query: ProgressQuery,

    /// Starts training jobs.
    pub launcher: JobLauncher,
}

impl AppState {
    /// Create a new AppState wrapped in Arc.
    pub fn new(config: &Config) -> Arc<Self> {
        let registry = ProgressRegistry::new();
        let artifacts = Arc::new(FsArtifactStore::new(config.paths()));

        Arc::new(Self {
            query: ProgressQuery::new(registry.clone(), artifacts),
            registry,
            launcher: config.launcher(),
        })
    }

    /// Create an AppState around an existing launcher.
    pub fn with_launcher(config: &Config, launcher: JobLauncher) -> Arc<Self> {
        let registry = ProgressRegistry::new();
        let artifacts = Arc::new(FsArtifactStore::new(config.paths()));

        Arc::new(Self {
            query: ProgressQuery::new(registry.clone(), artifacts),
            registry,
            launcher,
        })
    }
}
