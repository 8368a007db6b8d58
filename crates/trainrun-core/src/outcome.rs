//! Terminal outcome of an external job.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Files produced by a successful run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifacts {
    pub model_path: String,
    /// History plot path, already rewritten relative to the public root.
    pub history_path: String,
}

/// Final losses reported by a successful run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub train_loss: f64,
    pub val_loss: f64,
}

/// Why a job failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCategory {
    /// Input data the job needs is missing.
    MissingData,
    /// The GPU runtime failed.
    GpuFailure,
    /// The ML framework raised.
    FrameworkFailure,
    /// Anything else, including explicit `error` messages.
    Unknown,
    /// The process exited without reporting a result.
    ProcessExit,
}

impl FailureCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingData => "missing_data",
            Self::GpuFailure => "gpu_failure",
            Self::FrameworkFailure => "framework_failure",
            Self::Unknown => "unknown",
            Self::ProcessExit => "process_exit",
        }
    }
}

impl fmt::Display for FailureCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which signal produced a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureSource {
    /// An explicit `error` status line.
    Reported,
    /// Text the job wrote to stderr.
    Stderr,
    /// The process itself: exit status or supervision.
    Process,
}

/// The one terminal result of a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum JobOutcome {
    Success { artifacts: Artifacts, metrics: Metrics },
    Failure {
        category: FailureCategory,
        message: String,
        source: FailureSource,
    },
    Timeout,
}

impl JobOutcome {
    /// Create a failure raised by the process or its supervisor.
    pub fn failure(category: FailureCategory, message: impl Into<String>) -> Self {
        Self::Failure {
            category,
            message: message.into(),
            source: FailureSource::Process,
        }
    }

    /// Failure from an explicit `error` status line.
    pub fn reported(message: impl Into<String>) -> Self {
        Self::Failure {
            category: FailureCategory::Unknown,
            message: message.into(),
            source: FailureSource::Reported,
        }
    }

    /// Failure from classified stderr text.
    pub fn stderr(category: FailureCategory, text: impl Into<String>) -> Self {
        Self::Failure {
            category,
            message: text.into(),
            source: FailureSource::Stderr,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Message shown to the submitter when the job did not succeed.
    ///
    /// Returns `None` for a success.
    pub fn error_message(&self) -> Option<String> {
        match self {
            Self::Success { .. } => None,
            Self::Timeout => Some("Training process timed out".to_string()),
            Self::Failure {
                category,
                message,
                source,
            } => Some(match category {
                FailureCategory::MissingData => {
                    "Required data files not found. Please ensure processed data exists."
                        .to_string()
                }
                FailureCategory::GpuFailure => "GPU error occurred. Falling back to CPU.".to_string(),
                FailureCategory::FrameworkFailure => format!("PyTorch error: {}", message),
                FailureCategory::Unknown if *source == FailureSource::Stderr => {
                    format!("Training process error: {}", message)
                }
                FailureCategory::Unknown | FailureCategory::ProcessExit => message.clone(),
            }),
        }
    }
}
