//! In-memory progress registry.
//!
//! Tracks live progress for every running job, keyed by [`JobId`]. Each
//! operation takes the map lock once, so no caller ever sees a half-applied
//! update. Finished and stalled entries are removed by a periodic sweep.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use trainrun_core::limits::STALL_THRESHOLD;
use trainrun_core::{JobId, JobKind, ProgressStatus};
use trainrun_runner::ProgressSink;

/// Live progress of one job.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressEntry {
    pub job_id: JobId,

    /// Percent done, 0-100.
    pub percent: f64,

    pub status: ProgressStatus,
    pub kind: JobKind,

    /// When the first update arrived.
    pub start_time: Instant,

    /// When the latest update arrived. Never moves backwards.
    pub last_update: Instant,

    /// Wall-clock time of the first update.
    pub started_at: DateTime<Utc>,
}

impl ProgressEntry {
    fn new(job_id: JobId, percent: f64, status: ProgressStatus, kind: JobKind) -> Self {
        let now = Instant::now();
        Self {
            job_id,
            percent,
            status,
            kind,
            start_time: now,
            last_update: now,
            started_at: Utc::now(),
        }
    }

    /// Time since the last update.
    pub fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_update)
    }

    /// Returns true if no update arrived within the stall threshold.
    pub fn is_stale(&self, now: Instant) -> bool {
        self.idle_for(now) > STALL_THRESHOLD
    }
}

/// Result of a registry lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    /// No entry for this job.
    Missing,
    /// Entry is live.
    Active(ProgressEntry),
    /// Entry had stalled and has been evicted.
    Stalled(ProgressEntry),
}

/// Shared progress registry.
#[derive(Debug, Default)]
pub struct ProgressRegistry {
    entries: RwLock<HashMap<JobId, ProgressEntry>>,
}

impl ProgressRegistry {
    /// Create a new registry wrapped in Arc.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Record progress for a job.
    ///
    /// Creates the entry on the first update; later updates change percent,
    /// status and last-update time in place.
    pub async fn update(&self, job_id: &JobId, percent: f64, status: ProgressStatus, kind: JobKind) {
        let percent = percent.clamp(0.0, 100.0);
        let mut entries = self.entries.write().await;

        match entries.get_mut(job_id) {
            Some(entry) => {
                entry.percent = percent;
                entry.status = status;
                entry.last_update = entry.last_update.max(Instant::now());
            }
            None => {
                debug!(job_id = %job_id, kind = %kind, "Tracking new job");
                entries.insert(
                    job_id.clone(),
                    ProgressEntry::new(job_id.clone(), percent, status, kind),
                );
            }
        }
    }

    /// Point lookup.
    pub async fn get(&self, job_id: &JobId) -> Option<ProgressEntry> {
        self.entries.read().await.get(job_id).cloned()
    }

    /// Look up a job, evicting it if it has stalled.
    ///
    /// The staleness check and the removal happen under one write lock, so
    /// a concurrent sweep or query that already evicted the entry makes this
    /// return [`Lookup::Missing`].
    pub async fn lookup(&self, job_id: &JobId) -> Lookup {
        {
            let entries = self.entries.read().await;
            match entries.get(job_id) {
                None => return Lookup::Missing,
                Some(entry) if !entry.is_stale(Instant::now()) => {
                    return Lookup::Active(entry.clone())
                }
                Some(_) => {}
            }
        }

        let mut entries = self.entries.write().await;
        let Some(entry) = entries.get(job_id) else {
            return Lookup::Missing;
        };
        if !entry.is_stale(Instant::now()) {
            return Lookup::Active(entry.clone());
        }

        match entries.remove(job_id) {
            Some(entry) => {
                info!(
                    job_id = %job_id,
                    last_progress = entry.percent,
                    idle_secs = entry.idle_for(Instant::now()).as_secs(),
                    "Evicted stalled job"
                );
                Lookup::Stalled(entry)
            }
            None => Lookup::Missing,
        }
    }

    /// Remove every complete or stalled entry. Returns how many were removed.
    pub async fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();

        entries.retain(|job_id, entry| {
            let remove = entry.status == ProgressStatus::Complete || entry.is_stale(now);
            if remove {
                debug!(job_id = %job_id, status = %entry.status, "Sweeping progress entry");
            }
            !remove
        });

        before - entries.len()
    }

    /// Get the number of tracked jobs.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Run [`sweep`](Self::sweep) every `interval` until `cancel` fires.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration, cancel: CancellationToken) -> JoinHandle<()> {
        let registry = Arc::clone(self);

        tokio::spawn(async move {
            info!(interval_secs = interval.as_secs(), "Progress sweeper started");
            let mut ticker = tokio::time::interval(interval);

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        info!("Progress sweeper stopping");
                        break;
                    }
                    _ = ticker.tick() => {
                        let removed = registry.sweep().await;
                        if removed > 0 {
                            info!(removed, "Swept progress entries");
                        } else {
                            debug!("Progress sweep: nothing to remove");
                        }
                    }
                }
            }
        })
    }
}

#[async_trait]
impl ProgressSink for ProgressRegistry {
    async fn record(&self, job_id: &JobId, percent: f64, status: ProgressStatus, kind: JobKind) {
        self.update(job_id, percent, status, kind).await;
    }
}
