//! Status and kind enums for tracked jobs.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Progress status of a tracked job, as reported to pollers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    /// Nothing is known about the job yet.
    #[default]
    NotStarted,
    /// The job is reporting progress.
    Running,
    /// The job reported completion.
    Complete,
    /// The job ended in a failure or timed out.
    Error,
}

impl ProgressStatus {
    /// Returns true if no further updates are expected.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Error)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::Running => "running",
            Self::Complete => "complete",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for ProgressStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What kind of external job produced a progress entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Model training run.
    #[default]
    Training,
    /// Sample generation run.
    Generation,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Training => "training",
            Self::Generation => "generation",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "training" => Ok(Self::Training),
            "generation" => Ok(Self::Generation),
            other => Err(CoreError::InvalidJobKind(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_kind_parse() {
        assert_eq!("training".parse::<JobKind>().unwrap(), JobKind::Training);
        assert_eq!("generation".parse::<JobKind>().unwrap(), JobKind::Generation);
        assert!(matches!(
            "inference".parse::<JobKind>(),
            Err(CoreError::InvalidJobKind(_))
        ));
    }

    #[test]
    fn test_status_wire_names() {
        assert_eq!(
            serde_json::to_string(&ProgressStatus::NotStarted).unwrap(),
            "\"not_started\""
        );
        assert!(ProgressStatus::Error.is_terminal());
        assert!(!ProgressStatus::Running.is_terminal());
    }
}
