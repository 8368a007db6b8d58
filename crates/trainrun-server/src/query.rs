//! Progress queries.
//!
//! Answers "how far along is job X" from the registry, falling back to the
//! artifact store for jobs the registry no longer (or never) tracked.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::time::Instant;
use tracing::debug;

use trainrun_core::{JobId, JobKind, ProgressStatus};

use crate::artifacts::ArtifactStore;
use crate::registry::{Lookup, ProgressRegistry};

/// Query errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    /// The job stopped reporting; its entry has been evicted.
    #[error("Process appears to have stalled at {last_progress}%")]
    Stalled { last_progress: f64 },
}

/// Answer to a progress query.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressReport {
    /// Nothing known about the job and no output on disk.
    NotStarted,

    /// The job is tracked by the registry.
    Active {
        percent: f64,
        status: ProgressStatus,
        elapsed_secs: u64,
        /// `None` until the job reports non-zero progress.
        remaining_secs: Option<u64>,
        kind: JobKind,
        started_at: DateTime<Utc>,
    },

    /// The job is not tracked but its output exists.
    Finished { file: PathBuf },
}

impl ProgressReport {
    pub fn status(&self) -> ProgressStatus {
        match self {
            Self::NotStarted => ProgressStatus::NotStarted,
            Self::Active { status, .. } => *status,
            Self::Finished { .. } => ProgressStatus::Complete,
        }
    }

    pub fn percent(&self) -> f64 {
        match self {
            Self::NotStarted => 0.0,
            Self::Active { percent, .. } => *percent,
            Self::Finished { .. } => 100.0,
        }
    }
}

/// Linear estimate of the seconds left, given seconds spent and percent done.
pub fn estimate_remaining(elapsed_secs: u64, percent: f64) -> Option<u64> {
    if percent <= 0.0 {
        return None;
    }
    let remaining = (elapsed_secs as f64 / percent) * (100.0 - percent);
    Some(remaining.max(0.0).floor() as u64)
}

/// Read API over the registry and the artifact store.
#[derive(Clone)]
pub struct ProgressQuery {
    registry: Arc<ProgressRegistry>,
    artifacts: Arc<dyn ArtifactStore>,
}

impl ProgressQuery {
    pub fn new(registry: Arc<ProgressRegistry>, artifacts: Arc<dyn ArtifactStore>) -> Self {
        Self {
            registry,
            artifacts,
        }
    }

    /// Report progress for a job.
    ///
    /// `kind` selects which artifacts to look for when the registry has no
    /// entry.
    pub async fn query(&self, job_id: &JobId, kind: JobKind) -> Result<ProgressReport, QueryError> {
        match self.registry.lookup(job_id).await {
            Lookup::Stalled(entry) => Err(QueryError::Stalled {
                last_progress: entry.percent,
            }),
            Lookup::Active(entry) => {
                let elapsed_secs = Instant::now()
                    .saturating_duration_since(entry.start_time)
                    .as_secs();
                Ok(ProgressReport::Active {
                    percent: entry.percent,
                    status: entry.status,
                    elapsed_secs,
                    remaining_secs: estimate_remaining(elapsed_secs, entry.percent),
                    kind: entry.kind,
                    started_at: entry.started_at,
                })
            }
            Lookup::Missing => match self.artifacts.locate(job_id, kind).await {
                Some(file) => {
                    debug!(job_id = %job_id, file = %file.display(), "Found artifacts for untracked job");
                    Ok(ProgressReport::Finished { file })
                }
                None => Ok(ProgressReport::NotStarted),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::time::advance;

    /// Artifact store that knows exactly one finished job.
    struct OneArtifact(JobId);

    #[async_trait]
    impl ArtifactStore for OneArtifact {
        async fn locate(&self, job_id: &JobId, kind: JobKind) -> Option<PathBuf> {
            (job_id == &self.0 && kind == JobKind::Training)
                .then(|| PathBuf::from(format!("/models/music_generator_{}.pth", job_id)))
        }
    }

    fn query() -> (ProgressQuery, Arc<ProgressRegistry>) {
        let registry = ProgressRegistry::new();
        let query = ProgressQuery::new(
            registry.clone(),
            Arc::new(OneArtifact(JobId::new("finished"))),
        );
        (query, registry)
    }

    #[test]
    fn test_estimate_remaining() {
        assert_eq!(estimate_remaining(5, 10.0), Some(45));
        assert_eq!(estimate_remaining(10, 0.0), None);
        assert_eq!(estimate_remaining(7, 30.0), Some(16));
        assert_eq!(estimate_remaining(60, 100.0), Some(0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_elapsed_and_estimate() {
        let (query, registry) = query();
        let id = JobId::new("abc");

        registry
            .update(&id, 0.0, ProgressStatus::Running, JobKind::Training)
            .await;
        let report = query.query(&id, JobKind::Training).await.unwrap();
        assert!(matches!(
            report,
            ProgressReport::Active {
                elapsed_secs: 0,
                remaining_secs: None,
                ..
            }
        ));

        advance(Duration::from_secs(5)).await;
        registry
            .update(&id, 10.0, ProgressStatus::Running, JobKind::Training)
            .await;

        let report = query.query(&id, JobKind::Training).await.unwrap();
        match report {
            ProgressReport::Active {
                percent,
                status,
                elapsed_secs,
                remaining_secs,
                kind,
                ..
            } => {
                assert_eq!(percent, 10.0);
                assert_eq!(status, ProgressStatus::Running);
                assert_eq!(elapsed_secs, 5);
                assert_eq!(remaining_secs, Some(45));
                assert_eq!(kind, JobKind::Training);
            }
            other => panic!("expected active report, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_job_is_evicted() {
        let (query, registry) = query();
        let id = JobId::new("abc");

        registry
            .update(&id, 64.0, ProgressStatus::Running, JobKind::Training)
            .await;
        advance(Duration::from_secs(301)).await;

        assert_eq!(
            query.query(&id, JobKind::Training).await,
            Err(QueryError::Stalled { last_progress: 64.0 })
        );
        assert!(registry.get(&id).await.is_none());

        // Already evicted: reads as never started.
        assert_eq!(
            query.query(&id, JobKind::Training).await,
            Ok(ProgressReport::NotStarted)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_then_query_race() {
        let (query, registry) = query();
        let id = JobId::new("abc");

        registry
            .update(&id, 20.0, ProgressStatus::Running, JobKind::Training)
            .await;
        advance(Duration::from_secs(301)).await;

        assert_eq!(registry.sweep().await, 1);
        assert_eq!(
            query.query(&id, JobKind::Training).await,
            Ok(ProgressReport::NotStarted)
        );
    }

    #[tokio::test]
    async fn test_untracked_job_falls_back_to_artifacts() {
        let (query, _registry) = query();

        let report = query
            .query(&JobId::new("finished"), JobKind::Training)
            .await
            .unwrap();
        assert_eq!(
            report,
            ProgressReport::Finished {
                file: PathBuf::from("/models/music_generator_finished.pth")
            }
        );
        assert_eq!(report.percent(), 100.0);
        assert_eq!(report.status(), ProgressStatus::Complete);

        let unknown = query
            .query(&JobId::new("nope"), JobKind::Training)
            .await
            .unwrap();
        assert_eq!(unknown, ProgressReport::NotStarted);
        assert_eq!(unknown.percent(), 0.0);
    }
}
