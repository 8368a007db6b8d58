//! Launching and supervising external training jobs.
//!
//! [`JobLauncher::launch`] spawns the job process and hands it to a
//! supervisor task. The supervisor drives stdout, stderr, process exit and
//! the deadline from a single `select!` loop, feeding each signal to the
//! job's [`ResultResolver`] and its progress to a [`ProgressSink`].

use std::process::Stdio;
use std::sync::Arc;

use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tokio::sync::oneshot;
use tokio_stream::StreamExt;
use tokio_util::codec::{BytesCodec, FramedRead};
use tracing::{debug, error, info, warn};
use trainrun_core::limits::JOB_DEADLINE;
use trainrun_core::{
    FailureCategory, JobArgs, JobId, JobKind, JobOutcome, JobPaths, JobRequest, ProgressStatus,
};

use crate::classify::ErrorClassifier;
use crate::deadline::{terminate, DeadlineGuard};
use crate::error::RunnerError;
use crate::protocol::{self, ProtocolMessage};
use crate::resolver::ResultResolver;
use crate::sink::ProgressSink;

/// Launches training jobs as child processes.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use trainrun_core::{JobId, JobPaths, JobRequest};
/// use trainrun_runner::{JobLauncher, NoopSink};
///
/// async fn run() -> Result<(), Box<dyn std::error::Error>> {
///     let launcher = JobLauncher::new("python3")
///         .with_arg("src/python/train_model.py")
///         .with_paths(JobPaths::under("/srv/app"));
///
///     let handle = launcher.launch(JobId::generate(), &JobRequest::default(), Arc::new(NoopSink))?;
///     let outcome = handle.wait().await;
///     println!("{:?}", outcome);
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct JobLauncher {
    /// Program to run, e.g. "python3".
    program: String,

    /// Arguments placed before the serialized job arguments.
    args: Vec<String>,

    /// Directories handed to the job.
    paths: JobPaths,

    /// Kind recorded for progress of jobs from this launcher.
    kind: JobKind,

    classifier: Arc<ErrorClassifier>,

    /// Additional environment variables.
    env_vars: Vec<(String, String)>,
}

impl JobLauncher {
    /// Create a launcher for the given program.
    ///
    /// The program can be a bare name for PATH lookup, or a full path.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            paths: JobPaths::under("."),
            kind: JobKind::Training,
            classifier: Arc::new(ErrorClassifier::default()),
            env_vars: Vec::new(),
        }
    }

    /// Append a leading argument (e.g. the script path).
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several leading arguments.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set the directories handed to the job.
    pub fn with_paths(mut self, paths: JobPaths) -> Self {
        self.paths = paths;
        self
    }

    /// Set the kind recorded for progress.
    pub fn with_kind(mut self, kind: JobKind) -> Self {
        self.kind = kind;
        self
    }

    /// Replace the stderr classifier table.
    pub fn with_classifier(mut self, classifier: ErrorClassifier) -> Self {
        self.classifier = Arc::new(classifier);
        self
    }

    /// Add an environment variable.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.push((key.into(), value.into()));
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn paths(&self) -> &JobPaths {
        &self.paths
    }

    /// Start a job.
    ///
    /// The request, with defaults applied, is serialized as JSON and passed
    /// as the last argument. Fails with [`RunnerError::Launch`] if the
    /// program cannot be started, in which case nothing is reported to the
    /// sink. Must be called from within a Tokio runtime.
    pub fn launch(
        &self,
        job_id: JobId,
        request: &JobRequest,
        sink: Arc<dyn ProgressSink>,
    ) -> Result<JobHandle, RunnerError> {
        let args = JobArgs::resolve(job_id.clone(), request, self.paths.clone());
        let args_json = serde_json::to_string(&args)?;

        info!(
            job_id = %job_id,
            program = %self.program,
            epochs = args.epochs,
            batch_size = args.batch_size,
            "Launching job"
        );

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg(&args_json)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        for (key, value) in &self.env_vars {
            cmd.env(key, value);
        }

        debug!("Full command: {:?}", cmd);

        let mut child = cmd.spawn().map_err(|e| {
            error!(job_id = %job_id, error = %e, "Failed to spawn job process");
            RunnerError::Launch {
                program: self.program.clone(),
                source: e,
            }
        })?;

        let pid = child.id();
        info!(job_id = %job_id, pid = ?pid, "Job process spawned");

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| RunnerError::Protocol("Failed to get stdout".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| RunnerError::Protocol("Failed to get stderr".to_string()))?;

        let (resolver, outcome_rx) = ResultResolver::new(
            job_id.clone(),
            self.paths.public_dir.clone(),
            Arc::clone(&self.classifier),
        );

        let supervisor = Supervisor {
            job_id: job_id.clone(),
            kind: self.kind,
            sink,
            resolver,
            last_percent: 0.0,
        };
        tokio::spawn(supervisor.run(child, stdout, stderr));

        Ok(JobHandle {
            job_id,
            pid,
            outcome: outcome_rx,
        })
    }
}

/// Handle to a launched job.
#[derive(Debug)]
pub struct JobHandle {
    job_id: JobId,
    pid: Option<u32>,
    outcome: oneshot::Receiver<JobOutcome>,
}

impl JobHandle {
    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    /// OS process id at spawn time.
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Wait for the job's outcome.
    pub async fn wait(self) -> JobOutcome {
        match self.outcome.await {
            Ok(outcome) => outcome,
            Err(_) => {
                error!(job_id = %self.job_id, "Job supervisor ended without an outcome");
                JobOutcome::failure(
                    FailureCategory::Unknown,
                    "Job supervisor ended without an outcome",
                )
            }
        }
    }
}

/// Per-job task owning the child process.
struct Supervisor {
    job_id: JobId,
    kind: JobKind,
    sink: Arc<dyn ProgressSink>,
    resolver: ResultResolver,
    last_percent: f64,
}

impl Supervisor {
    async fn run(mut self, mut child: Child, stdout: ChildStdout, stderr: ChildStderr) {
        let mut messages = protocol::reader(stdout);
        let mut diagnostics = FramedRead::new(stderr, BytesCodec::new());
        let mut guard = DeadlineGuard::start(JOB_DEADLINE);
        let mut stdout_open = true;
        let mut stderr_open = true;

        loop {
            tokio::select! {
                frame = messages.next(), if stdout_open => match frame {
                    Some(Ok(message)) => {
                        if self.on_message(message).await {
                            guard.disarm();
                        }
                    }
                    Some(Err(e)) => {
                        error!(job_id = %self.job_id, error = %e, "Error reading job stdout");
                        stdout_open = false;
                    }
                    None => {
                        info!(
                            job_id = %self.job_id,
                            dropped_lines = messages.decoder().dropped(),
                            "Job stdout closed (EOF)"
                        );
                        stdout_open = false;
                    }
                },
                chunk = diagnostics.next(), if stderr_open => match chunk {
                    Some(Ok(bytes)) => {
                        let text = String::from_utf8_lossy(&bytes);
                        if self.resolver.on_stderr(&text) {
                            guard.disarm();
                            self.report(ProgressStatus::Error).await;
                        }
                    }
                    Some(Err(e)) => {
                        error!(job_id = %self.job_id, error = %e, "Error reading job stderr");
                        stderr_open = false;
                    }
                    None => stderr_open = false,
                },
                status = child.wait(), if !stdout_open && !stderr_open => {
                    let code = match status {
                        Ok(status) => {
                            info!(
                                job_id = %self.job_id,
                                exit_code = ?status.code(),
                                success = status.success(),
                                "Job process exited"
                            );
                            status.code()
                        }
                        Err(e) => {
                            error!(job_id = %self.job_id, error = %e, "Failed to wait for job process");
                            None
                        }
                    };
                    if self.resolver.on_exit(code) {
                        self.report(ProgressStatus::Error).await;
                    }
                    return;
                }
                () = guard.expired() => {
                    warn!(
                        job_id = %self.job_id,
                        deadline_secs = JOB_DEADLINE.as_secs(),
                        "Job exceeded deadline, terminating"
                    );
                    terminate(&mut child, &self.job_id);
                    if self.resolver.on_deadline() {
                        self.report(ProgressStatus::Error).await;
                    }
                    match child.wait().await {
                        Ok(status) => debug!(job_id = %self.job_id, exit_code = ?status.code(), "Reaped timed out job"),
                        Err(e) => error!(job_id = %self.job_id, error = %e, "Failed to reap timed out job"),
                    }
                    return;
                }
            }
        }
    }

    /// Handle one status line. Returns true if it settled the job.
    async fn on_message(&mut self, message: ProtocolMessage) -> bool {
        if self.resolver.is_settled() {
            debug!(
                job_id = %self.job_id,
                message_type = message.kind(),
                "Ignoring status line for settled job"
            );
            return false;
        }

        match &message {
            ProtocolMessage::Progress { percent } => {
                self.last_percent = percent.clamp(0.0, 100.0);
                debug!(job_id = %self.job_id, percent = self.last_percent, "Job progress");
                self.report(ProgressStatus::Running).await;
            }
            ProtocolMessage::EarlyStopping { epoch } => {
                info!(job_id = %self.job_id, epoch = *epoch, "Early stopping");
                self.report(ProgressStatus::Running).await;
            }
            ProtocolMessage::Complete { .. } => {
                self.last_percent = 100.0;
                self.report(ProgressStatus::Complete).await;
            }
            ProtocolMessage::Error { message } => {
                warn!(job_id = %self.job_id, error = %message, "Job reported an error");
                self.report(ProgressStatus::Error).await;
            }
        }

        self.resolver.on_message(&message)
    }

    async fn report(&self, status: ProgressStatus) {
        self.sink
            .record(&self.job_id, self.last_percent, status, self.kind)
            .await;
    }
}
