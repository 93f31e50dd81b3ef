//! On-disk job records
//!
//! Layout: `<root>/<key>/status.json`, `<root>/<key>/analysis.md`, and the
//! job's chart files next to them.

use std::path::{Path, PathBuf};

use super::{JobKey, JobRecord, JobStatus};
use crate::error::Result;

const STATUS_FILE: &str = "status.json";
const RESULT_FILE: &str = "analysis.md";

#[derive(Debug, Clone)]
pub struct JobStore {
    root: PathBuf,
}

impl JobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn job_dir(&self, key: &JobKey) -> PathBuf {
        self.root.join(key.as_str())
    }

    pub fn result_path(&self, key: &JobKey) -> PathBuf {
        self.job_dir(key).join(RESULT_FILE)
    }

    /// Drop the previous run's result and charts. The status record stays
    /// until the caller replaces it.
    pub fn reset(&self, key: &JobKey) -> Result<()> {
        let dir = self.job_dir(key);
        std::fs::create_dir_all(&dir)?;

        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            if entry.file_name() == STATUS_FILE {
                continue;
            }
            if entry.file_type()?.is_dir() {
                std::fs::remove_dir_all(entry.path())?;
            } else {
                std::fs::remove_file(entry.path())?;
            }
        }
        Ok(())
    }

    pub fn read_status(&self, key: &JobKey) -> Result<Option<JobRecord>> {
        let path = self.job_dir(key).join(STATUS_FILE);
        match std::fs::read_to_string(&path) {
            Ok(json) => Ok(Some(serde_json::from_str(&json)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Replace the whole record: write a temporary file, then rename it over
    /// the old one
    pub fn write_status(&self, key: &JobKey, record: &JobRecord) -> Result<()> {
        let dir = self.job_dir(key);
        std::fs::create_dir_all(&dir)?;

        let tmp = dir.join(format!(".{}.{}.tmp", STATUS_FILE, uuid::Uuid::new_v4()));
        std::fs::write(&tmp, serde_json::to_string_pretty(record)?)?;
        if let Err(e) = std::fs::rename(&tmp, dir.join(STATUS_FILE)) {
            let _ = std::fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }

    pub fn read_result(&self, key: &JobKey) -> Result<Option<String>> {
        match std::fs::read_to_string(self.result_path(key)) {
            Ok(markdown) => Ok(Some(markdown)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// The result markdown, only when the status record says `completed`
    pub fn completed_result(&self, key: &JobKey) -> Result<Option<String>> {
        match self.read_status(key)? {
            Some(record) if record.status == JobStatus::Completed => self.read_result(key),
            _ => Ok(None),
        }
    }

    pub fn write_result(&self, key: &JobKey, markdown: &str) -> Result<()> {
        std::fs::create_dir_all(self.job_dir(key))?;
        std::fs::write(self.result_path(key), markdown)?;
        Ok(())
    }
}
