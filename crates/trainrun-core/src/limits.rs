//! Process-wide timing constants.
//!
//! These are not configurable per job.

use std::time::Duration;

/// Hard ceiling on the run time of one external job.
pub const JOB_DEADLINE: Duration = Duration::from_secs(2 * 60 * 60);

/// A job with no progress update for this long is presumed wedged.
pub const STALL_THRESHOLD: Duration = Duration::from_secs(5 * 60);

/// How often the progress registry is swept.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(60);
