//! Background job lifecycle
//!
//! A job goes `pending -> in_progress -> completed | failed`. Its status
//! record and result live on disk in a per-job directory, so callers can
//! poll without holding on to the task that runs it.

pub mod store;
pub mod tracker;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub use store::JobStore;
pub use tracker::{JobRunner, JobTracker};

/// Filesystem-safe job identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobKey(String);

/// Joins the parts of a multi-part key. Slugs never contain it.
const PART_SEPARATOR: &str = "--";

impl JobKey {
    /// Build a key from free text: lowercased, runs of anything other than
    /// ASCII letters and digits become a single `-`
    pub fn new(raw: &str) -> Result<Self> {
        Ok(Self(slug(raw)?))
    }

    /// Slug each part on its own and join them with `--`, so distinct part
    /// lists never collide
    pub fn from_parts(parts: &[&str]) -> Result<Self> {
        let slugs = parts.iter().map(|part| slug(part)).collect::<Result<Vec<_>>>()?;
        if slugs.is_empty() {
            return Err(Error::Agent("Job key needs at least one part".to_string()));
        }
        Ok(Self(slugs.join(PART_SEPARATOR)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn slug(raw: &str) -> Result<String> {
    let mut slug = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }

    if slug.is_empty() {
        return Err(Error::Agent(format!("Invalid job key: {:?}", raw)));
    }
    Ok(slug)
}

impl fmt::Display for JobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Job status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::InProgress => "in_progress",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted status record. `completed_at` is set exactly when the status
/// is terminal; `error` only when it is `failed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    pub status: JobStatus,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobRecord {
    pub fn pending() -> Self {
        Self {
            status: JobStatus::Pending,
            started_at: Utc::now(),
            completed_at: None,
            error: None,
        }
    }

    pub fn in_progress() -> Self {
        Self {
            status: JobStatus::InProgress,
            ..Self::pending()
        }
    }

    pub fn completed(started_at: DateTime<Utc>) -> Self {
        Self {
            status: JobStatus::Completed,
            started_at,
            completed_at: Some(Utc::now()),
            error: None,
        }
    }

    pub fn failed(started_at: DateTime<Utc>, error: impl Into<String>) -> Self {
        Self {
            status: JobStatus::Failed,
            started_at,
            completed_at: Some(Utc::now()),
            error: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_slugging() {
        assert_eq!(JobKey::new("TeamA vs TeamB week 5").unwrap().as_str(), "teama-vs-teamb-week-5");
        assert_eq!(
            JobKey::new("  Minnesota Vikings -vs- Green Bay Packers!! ").unwrap().as_str(),
            "minnesota-vikings-vs-green-bay-packers"
        );
        assert_eq!(JobKey::new("../etc/passwd").unwrap().as_str(), "etc-passwd");
    }

    #[test]
    fn test_empty_key_rejected() {
        assert!(JobKey::new("  --  ").is_err());
        assert!(JobKey::from_parts(&["a", " ! "]).is_err());
        assert!(JobKey::from_parts(&[]).is_err());
    }

    #[test]
    fn test_parts_never_collide() {
        let left = JobKey::from_parts(&["A vs B", "C"]).unwrap();
        let right = JobKey::from_parts(&["A", "B vs C"]).unwrap();
        assert_eq!(left.as_str(), "a-vs-b--c");
        assert_eq!(right.as_str(), "a--b-vs-c");
        assert_ne!(left, right);
    }

    #[test]
    fn test_status_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&JobStatus::InProgress).unwrap(), "\"in_progress\"");
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::Pending.is_terminal());
    }

    #[test]
    fn test_record_invariants() {
        let pending = JobRecord::pending();
        assert!(pending.completed_at.is_none() && pending.error.is_none());

        let failed = JobRecord::failed(pending.started_at, "boom");
        assert!(failed.completed_at.is_some());
        assert_eq!(failed.error.as_deref(), Some("boom"));

        let completed = JobRecord::completed(pending.started_at);
        assert!(completed.completed_at.is_some() && completed.error.is_none());
        assert_eq!(completed.started_at, pending.started_at);
    }

    #[test]
    fn test_record_json_omits_empty_fields() {
        let value = serde_json::to_value(JobRecord::pending()).unwrap();
        assert_eq!(value["status"], "pending");
        assert!(value.get("completed_at").is_none());
        assert!(value.get("error").is_none());
    }
}
