//! Newtype wrapper for job identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::CoreError;

/// Unique identifier for one launched external job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Create a new JobId from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a new random JobId.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Get the inner string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse an id received from a client.
    ///
    /// Ids end up in artifact file names, so anything that could act as a
    /// path component is rejected.
    pub fn parse(id: &str) -> Result<Self, CoreError> {
        let id = Self::new(id);
        if id.is_path_safe() {
            Ok(id)
        } else {
            Err(CoreError::InvalidJobId(id.0))
        }
    }

    /// Returns true if the id is non-empty and contains no path separator
    /// or `..`.
    pub fn is_path_safe(&self) -> bool {
        !self.0.is_empty()
            && !self.0.contains(&['/', '\\', '\0'][..])
            && !self.0.contains("..")
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_id_generate() {
        let id1 = JobId::generate();
        let id2 = JobId::generate();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_id_display() {
        let id = JobId::new("abc");
        assert_eq!(format!("{}", id), "abc");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"abc\"");
    }

    #[test]
    fn test_parse_rejects_path_like_ids() {
        let generated = JobId::generate();
        assert_eq!(JobId::parse(generated.as_str()).unwrap(), generated);
        assert!(JobId::parse("run-42_b").is_ok());

        for bad in ["", "x/../../secret", "..", "a\\b", "/etc/passwd", "a..b"] {
            assert!(
                matches!(JobId::parse(bad), Err(CoreError::InvalidJobId(_))),
                "accepted {:?}",
                bad
            );
            assert!(!JobId::new(bad).is_path_safe());
        }
    }
}
