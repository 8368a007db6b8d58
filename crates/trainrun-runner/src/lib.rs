//! External job runner for trainrun
//!
//! This crate launches a training job as a subprocess, decodes the
//! line-delimited JSON status protocol it writes to stdout, classifies
//! anything it writes to stderr, enforces the hard run deadline, and reduces
//! all of that to exactly one [`JobOutcome`](trainrun_core::JobOutcome).
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use trainrun_core::{JobId, JobPaths, JobRequest};
//! use trainrun_runner::{JobLauncher, NoopSink};
//!
//! async fn train() -> Result<(), Box<dyn std::error::Error>> {
//!     let launcher = JobLauncher::new("python3")
//!         .with_arg("src/python/train_model.py")
//!         .with_paths(JobPaths::under("."));
//!
//!     let handle = launcher.launch(
//!         JobId::generate(),
//!         &JobRequest::default().with_epochs(10),
//!         Arc::new(NoopSink),
//!     )?;
//!
//!     println!("Outcome: {:?}", handle.wait().await);
//!     Ok(())
//! }
//! ```

mod classify;
mod deadline;
mod error;
mod launcher;
mod protocol;
mod resolver;
mod sink;

pub use classify::{ClassifierRule, ErrorClassifier};
pub use deadline::{terminate, DeadlineGuard};
pub use error::RunnerError;
pub use launcher::{JobHandle, JobLauncher};
pub use protocol::{ProtocolMessage, ProtocolReader, StatusCodec};
pub use resolver::{public_url, ResultResolver};
pub use sink::{NoopSink, ProgressSink};
