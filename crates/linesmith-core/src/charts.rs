//! Chart artifacts and their on-disk naming

use std::path::PathBuf;

use tracing::{debug, warn};

/// A PNG produced by one code execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartArtifact {
    /// Position within the execution's output set
    pub index: usize,
    pub png: Vec<u8>,
}

/// Writes charts into a job directory as `<prefix>-<n>.png`
#[derive(Debug, Clone)]
pub struct ChartStore {
    dir: PathBuf,
    prefix: String,
}

impl ChartStore {
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
        }
    }

    pub fn file_name(&self, n: usize) -> String {
        format!("{}-{}.png", self.prefix, n)
    }

    /// Save `charts` numbered from `offset` in slice order and return the
    /// file names written. On failure the files written by this call are
    /// removed again.
    pub async fn save(&self, charts: &[ChartArtifact], offset: usize) -> std::io::Result<Vec<String>> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let mut saved = Vec::with_capacity(charts.len());
        for (position, chart) in charts.iter().enumerate() {
            let name = self.file_name(offset + position);
            if let Err(e) = tokio::fs::write(self.dir.join(&name), &chart.png).await {
                self.remove(&saved).await;
                return Err(e);
            }
            debug!(file = %name, bytes = chart.png.len(), "Saved chart");
            saved.push(name);
        }
        Ok(saved)
    }

    async fn remove(&self, names: &[String]) {
        for name in names {
            if let Err(e) = tokio::fs::remove_file(self.dir.join(name)).await {
                warn!(file = %name, "Failed to remove partial chart: {}", e);
            }
        }
    }
}
