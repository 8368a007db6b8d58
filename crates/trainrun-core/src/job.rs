//! Job request types.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::JobId;

/// Epoch count used when a request leaves it out.
pub const DEFAULT_EPOCHS: u32 = 100;

/// Batch size used when a request leaves it out.
pub const DEFAULT_BATCH_SIZE: u32 = 32;

/// A submitted training request.
///
/// Both fields are optional on the wire; a missing or zero value takes the
/// default when the job is launched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRequest {
    #[serde(default)]
    pub epochs: Option<u32>,

    #[serde(default, alias = "batch_size")]
    pub batch_size: Option<u32>,
}

impl JobRequest {
    /// Builder method to set the epoch count.
    pub fn with_epochs(mut self, epochs: u32) -> Self {
        self.epochs = Some(epochs);
        self
    }

    /// Builder method to set the batch size.
    pub fn with_batch_size(mut self, batch_size: u32) -> Self {
        self.batch_size = Some(batch_size);
        self
    }

    /// Epoch count with the default applied.
    pub fn epochs_or_default(&self) -> u32 {
        self.epochs.filter(|&e| e > 0).unwrap_or(DEFAULT_EPOCHS)
    }

    /// Batch size with the default applied.
    pub fn batch_size_or_default(&self) -> u32 {
        self.batch_size.filter(|&b| b > 0).unwrap_or(DEFAULT_BATCH_SIZE)
    }
}

/// Directories the external job reads from and writes to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobPaths {
    pub base_dir: PathBuf,
    pub model_dir: PathBuf,
    pub output_dir: PathBuf,
    pub public_dir: PathBuf,
}

impl JobPaths {
    /// Standard layout under a project root.
    pub fn under(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        Self {
            model_dir: base_dir.join("models"),
            output_dir: base_dir.join("output"),
            public_dir: base_dir.join("public"),
            base_dir,
        }
    }
}

/// The single argument handed to the external job, serialized as JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobArgs {
    pub id: JobId,
    pub epochs: u32,
    pub batch_size: u32,
    #[serde(flatten)]
    pub paths: JobPaths,
}

impl JobArgs {
    /// Resolve a request into job arguments, applying defaults.
    pub fn resolve(id: JobId, request: &JobRequest, paths: JobPaths) -> Self {
        Self {
            id,
            epochs: request.epochs_or_default(),
            batch_size: request.batch_size_or_default(),
            paths,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_applied() {
        let args = JobArgs::resolve(
            JobId::new("abc"),
            &JobRequest::default(),
            JobPaths::under("/srv/app"),
        );
        assert_eq!(args.epochs, DEFAULT_EPOCHS);
        assert_eq!(args.batch_size, DEFAULT_BATCH_SIZE);
    }

    #[test]
    fn test_zero_takes_default() {
        let request = JobRequest::default().with_epochs(0).with_batch_size(64);
        assert_eq!(request.epochs_or_default(), 100);
        assert_eq!(request.batch_size_or_default(), 64);
    }

    #[test]
    fn test_request_accepts_camel_case() {
        let request: JobRequest =
            serde_json::from_value(json!({ "epochs": 5, "batchSize": 8 })).unwrap();
        assert_eq!(request.epochs, Some(5));
        assert_eq!(request.batch_size, Some(8));

        let empty: JobRequest = serde_json::from_value(json!({})).unwrap();
        assert_eq!(empty, JobRequest::default());
    }

    #[test]
    fn test_args_wire_shape() {
        let args = JobArgs::resolve(
            JobId::new("abc"),
            &JobRequest::default().with_epochs(3),
            JobPaths::under("/srv/app"),
        );
        let value = serde_json::to_value(&args).unwrap();
        assert_eq!(
            value,
            json!({
                "id": "abc",
                "epochs": 3,
                "batch_size": 32,
                "base_dir": "/srv/app",
                "model_dir": "/srv/app/models",
                "output_dir": "/srv/app/output",
                "public_dir": "/srv/app/public",
            })
        );
    }
}
