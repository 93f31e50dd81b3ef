//! Chart artifact collection

use std::path::Path;

use serde::{Deserialize, Serialize};

/// A PNG image produced by a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chart {
    /// Position among the charts of this run, starting at zero
    pub index: usize,
    pub png: Vec<u8>,
}

/// Read every `.png` file directly inside `dir`, ordered by file name
pub async fn collect_charts(dir: &Path) -> std::io::Result<Vec<Chart>> {
    let mut paths = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_png = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("png"));
        if is_png && entry.file_type().await?.is_file() {
            paths.push(path);
        }
    }
    paths.sort();

    let mut charts = Vec::with_capacity(paths.len());
    for (index, path) in paths.into_iter().enumerate() {
        charts.push(Chart {
            index,
            png: tokio::fs::read(&path).await?,
        });
    }
    Ok(charts)
}
