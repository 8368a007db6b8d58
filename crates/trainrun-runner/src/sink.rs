//! Progress reporting seam between a running job and whoever tracks it.

use async_trait::async_trait;
use trainrun_core::{JobId, JobKind, ProgressStatus};

/// Receives progress for running jobs.
///
/// The launcher calls this for every status change of a job, in the order
/// the job reported them.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn record(&self, job_id: &JobId, percent: f64, status: ProgressStatus, kind: JobKind);
}

/// A sink that drops every update.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

#[async_trait]
impl ProgressSink for NoopSink {
    async fn record(&self, _job_id: &JobId, _percent: f64, _status: ProgressStatus, _kind: JobKind) {}
}
