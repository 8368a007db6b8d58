//! One-shot settlement of a job's outcome.
//!
//! A running job produces several signals that could each end it: a
//! terminal status line, stderr output, the process exiting, the deadline.
//! [`ResultResolver`] turns whichever arrives first into the job's
//! [`JobOutcome`] and ignores the rest.

use std::path::{Path, PathBuf, MAIN_SEPARATOR};
use std::sync::Arc;

use tokio::sync::oneshot;
use tracing::{debug, info, warn};
use trainrun_core::{Artifacts, FailureCategory, JobId, JobOutcome, Metrics};

use crate::classify::ErrorClassifier;
use crate::protocol::ProtocolMessage;

/// Rewrite a path under the public root as a URL path.
///
/// The first occurrence of the public root is removed and separators are
/// normalized to `/`.
pub fn public_url(path: &str, public_root: &Path) -> String {
    let root = public_root.to_string_lossy();
    let stripped = if root.is_empty() {
        path.to_string()
    } else {
        path.replacen(root.as_ref(), "", 1)
    };
    stripped.replace(MAIN_SEPARATOR, "/")
}

/// Reduces the signals of one job to a single [`JobOutcome`].
pub struct ResultResolver {
    job_id: JobId,
    public_root: PathBuf,
    classifier: Arc<ErrorClassifier>,
    tx: Option<oneshot::Sender<JobOutcome>>,
    outcome: Option<JobOutcome>,

    /// A `complete` or `error` line was seen.
    saw_result: bool,
}

impl ResultResolver {
    /// Create a resolver and the receiver its outcome is delivered on.
    pub fn new(
        job_id: JobId,
        public_root: impl Into<PathBuf>,
        classifier: Arc<ErrorClassifier>,
    ) -> (Self, oneshot::Receiver<JobOutcome>) {
        let (tx, rx) = oneshot::channel();
        let resolver = Self {
            job_id,
            public_root: public_root.into(),
            classifier,
            tx: Some(tx),
            outcome: None,
            saw_result: false,
        };
        (resolver, rx)
    }

    pub fn is_settled(&self) -> bool {
        self.outcome.is_some()
    }

    /// The outcome, once settled.
    pub fn outcome(&self) -> Option<&JobOutcome> {
        self.outcome.as_ref()
    }

    /// Feed a status line. Returns true if this settled the job.
    pub fn on_message(&mut self, message: &ProtocolMessage) -> bool {
        match message {
            ProtocolMessage::Complete {
                model_path,
                history_path,
                train_loss,
                val_loss,
            } => {
                self.saw_result = true;
                self.settle(JobOutcome::Success {
                    artifacts: Artifacts {
                        model_path: model_path.clone(),
                        history_path: public_url(history_path, &self.public_root),
                    },
                    metrics: Metrics {
                        train_loss: *train_loss,
                        val_loss: *val_loss,
                    },
                })
            }
            ProtocolMessage::Error { message } => {
                self.saw_result = true;
                self.settle(JobOutcome::reported(message.clone()))
            }
            ProtocolMessage::Progress { .. } | ProtocolMessage::EarlyStopping { .. } => false,
        }
    }

    /// Feed a chunk of stderr. Returns true if this settled the job.
    pub fn on_stderr(&mut self, text: &str) -> bool {
        let text = text.trim();
        if text.is_empty() {
            return false;
        }
        warn!(job_id = %self.job_id, stderr = %text, "Job stderr");

        let category = self.classifier.classify(text);
        self.settle(JobOutcome::stderr(category, text))
    }

    /// Feed the process exit code (`None` when killed by a signal).
    ///
    /// Any exit before a `complete` or `error` line settles a
    /// [`FailureCategory::ProcessExit`] failure, including a clean exit with
    /// code 0. Returns true if this settled the job.
    pub fn on_exit(&mut self, code: Option<i32>) -> bool {
        if self.saw_result {
            debug!(job_id = %self.job_id, exit_code = ?code, "Job exited after reporting a result");
            return false;
        }

        let message = match code {
            // Not only non-zero codes: a job that exits cleanly without a
            // result would otherwise sit until the deadline.
            Some(0) => "Process exited without reporting a result".to_string(),
            Some(code) => format!("Process exited with code {}", code),
            None => "Process was terminated by a signal".to_string(),
        };
        self.settle(JobOutcome::failure(FailureCategory::ProcessExit, message))
    }

    /// Signal that the deadline passed. Returns true if this settled the job.
    pub fn on_deadline(&mut self) -> bool {
        self.settle(JobOutcome::Timeout)
    }

    fn settle(&mut self, outcome: JobOutcome) -> bool {
        if let Some(existing) = &self.outcome {
            debug!(
                job_id = %self.job_id,
                settled = ?existing,
                ignored = ?outcome,
                "Ignoring signal for settled job"
            );
            return false;
        }

        info!(job_id = %self.job_id, outcome = ?outcome, "Job settled");
        if let Some(tx) = self.tx.take() {
            if tx.send(outcome.clone()).is_err() {
                debug!(job_id = %self.job_id, "Outcome receiver dropped");
            }
        }
        self.outcome = Some(outcome);
        true
    }
}
