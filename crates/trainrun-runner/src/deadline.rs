//! Hard run deadline for external jobs.

use std::future;
use std::pin::Pin;
use std::time::Duration;

use tokio::process::Child;
use tokio::time::{sleep, Instant, Sleep};
use tracing::{debug, info};
use trainrun_core::JobId;

/// Wall-clock deadline armed when a job launches.
///
/// [`DeadlineGuard::expired`] resolves once the deadline passes while the
/// guard is armed. After [`DeadlineGuard::disarm`] it never resolves.
#[derive(Debug)]
pub struct DeadlineGuard {
    sleep: Pin<Box<Sleep>>,
    deadline: Instant,
    armed: bool,
}

impl DeadlineGuard {
    /// Arm a guard that expires `duration` from now.
    pub fn start(duration: Duration) -> Self {
        let deadline = Instant::now() + duration;
        Self {
            sleep: Box::pin(sleep(duration)),
            deadline,
            armed: true,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Cancel the guard. Idempotent.
    pub fn disarm(&mut self) {
        self.armed = false;
    }

    /// Wait for the deadline.
    ///
    /// Cancel safe; the guard disarms itself when it fires.
    pub async fn expired(&mut self) {
        if !self.armed {
            future::pending::<()>().await;
        }
        self.sleep.as_mut().await;
        self.armed = false;
    }
}

/// Forcibly terminate a job process.
///
/// Killing a process that already exited is not an error.
pub fn terminate(child: &mut Child, job_id: &JobId) {
    match child.start_kill() {
        Ok(()) => info!(job_id = %job_id, pid = ?child.id(), "Sent kill to job process"),
        Err(e) => debug!(job_id = %job_id, error = %e, "Job process already gone"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trainrun_core::limits::JOB_DEADLINE;

    #[tokio::test(start_paused = true)]
    async fn test_fires_at_deadline() {
        let start = Instant::now();
        let mut guard = DeadlineGuard::start(JOB_DEADLINE);

        guard.expired().await;

        assert!(Instant::now() - start >= JOB_DEADLINE);
        assert!(!guard.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_before_deadline() {
        let mut guard = DeadlineGuard::start(JOB_DEADLINE);

        tokio::select! {
            biased;
            _ = guard.expired() => panic!("deadline fired early"),
            _ = sleep(JOB_DEADLINE - Duration::from_secs(1)) => {}
        }
        assert!(guard.is_armed());

        tokio::time::advance(Duration::from_secs(2)).await;
        guard.expired().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_disarmed_never_fires() {
        let mut guard = DeadlineGuard::start(Duration::from_secs(10));
        guard.disarm();
        guard.disarm();

        let waited = tokio::time::timeout(Duration::from_secs(3600), guard.expired()).await;
        assert!(waited.is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_terminate_is_idempotent() {
        let mut child = tokio::process::Command::new("sh")
            .arg("-c")
            .arg("exit 0")
            .spawn()
            .unwrap();
        let status = child.wait().await.unwrap();
        assert!(status.success());

        let id = JobId::new("gone");
        terminate(&mut child, &id);
        terminate(&mut child, &id);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_terminate_kills_running_process() {
        let mut child = tokio::process::Command::new("sleep")
            .arg("30")
            .spawn()
            .unwrap();

        terminate(&mut child, &JobId::new("sleepy"));
        let status = child.wait().await.unwrap();
        assert!(!status.success());
        assert_eq!(status.code(), None);
    }
}
