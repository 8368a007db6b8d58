//! HTTP request and response types.

use serde::{Deserialize, Serialize};
use trainrun_core::{Artifacts, JobId, JobKind, Metrics, ProgressStatus};

use crate::query::ProgressReport;

// ============================================================================
// Training types
// ============================================================================

/// Response body for a successful training run.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainResponse {
    pub id: String,
    pub model_path: String,
    pub history_path: String,
    pub train_loss: f64,
    pub val_loss: f64,
}

impl TrainResponse {
    pub fn new(id: &JobId, artifacts: Artifacts, metrics: Metrics) -> Self {
        Self {
            id: id.as_str().to_string(),
            model_path: artifacts.model_path,
            history_path: artifacts.history_path,
            train_loss: metrics.train_loss,
            val_loss: metrics.val_loss,
        }
    }
}

// ============================================================================
// Progress types
// ============================================================================

/// Query string for the progress endpoint.
#[derive(Debug, Deserialize)]
pub struct ProgressParams {
    pub id: Option<String>,

    #[serde(rename = "type")]
    pub kind: Option<String>,
}

/// Response body for the progress endpoint.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ProgressResponse {
    Active {
        progress: f64,
        status: ProgressStatus,
        #[serde(rename = "timeElapsed")]
        time_elapsed: u64,
        #[serde(rename = "estimatedTimeRemaining")]
        estimated_time_remaining: Option<u64>,
        kind: JobKind,
        #[serde(rename = "startedAt")]
        started_at: String,
    },
    Finished {
        progress: f64,
        status: ProgressStatus,
        file: String,
    },
    NotStarted {
        progress: f64,
        status: ProgressStatus,
    },
}

impl From<ProgressReport> for ProgressResponse {
    fn from(report: ProgressReport) -> Self {
        match report {
            ProgressReport::NotStarted => Self::NotStarted {
                progress: 0.0,
                status: ProgressStatus::NotStarted,
            },
            ProgressReport::Active {
                percent,
                status,
                elapsed_secs,
                remaining_secs,
                kind,
                started_at,
            } => Self::Active {
                progress: percent,
                status,
                time_elapsed: elapsed_secs,
                estimated_time_remaining: remaining_secs,
                kind,
                started_at: started_at.to_rfc3339(),
            },
            ProgressReport::Finished { file } => Self::Finished {
                progress: 100.0,
                status: ProgressStatus::Complete,
                file: file.to_string_lossy().into_owned(),
            },
        }
    }
}

/// Response body for a stalled job.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StalledResponse {
    pub error: String,
    pub last_progress: f64,
}

// ============================================================================
// Error types
// ============================================================================

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
