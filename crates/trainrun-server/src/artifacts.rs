//! Lookup of artifacts written by finished jobs.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;
use trainrun_core::{JobId, JobKind, JobPaths};

/// Answers whether a job's output exists.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Path of the job's primary output, if everything it should have
    /// written is present.
    async fn locate(&self, job_id: &JobId, kind: JobKind) -> Option<PathBuf>;
}

/// Artifact store over the job output directories.
///
/// Training writes `models/music_generator_<id>.pth` and
/// `public/training_history_<id>.png`; generation writes
/// `public/generated/generated_<id>.mid`.
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    paths: JobPaths,
}

impl FsArtifactStore {
    pub fn new(paths: JobPaths) -> Self {
        Self { paths }
    }

    /// Files a finished job leaves behind; the first is the one reported.
    pub fn expected_files(&self, job_id: &JobId, kind: JobKind) -> Vec<PathBuf> {
        match kind {
            JobKind::Training => vec![
                self.paths
                    .model_dir
                    .join(format!("music_generator_{}.pth", job_id)),
                self.paths
                    .public_dir
                    .join(format!("training_history_{}.png", job_id)),
            ],
            JobKind::Generation => vec![self
                .paths
                .public_dir
                .join("generated")
                .join(format!("generated_{}.mid", job_id))],
        }
    }
}

async fn exists(path: &Path) -> bool {
    match tokio::fs::try_exists(path).await {
        Ok(found) => found,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "Cannot check artifact");
            false
        }
    }
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn locate(&self, job_id: &JobId, kind: JobKind) -> Option<PathBuf> {
        if !job_id.is_path_safe() {
            debug!(job_id = %job_id, "Refusing artifact lookup for path-like job id");
            return None;
        }
        let files = self.expected_files(job_id, kind);
        for file in &files {
            if !exists(file).await {
                return None;
            }
        }
        files.into_iter().next()
    }
}
