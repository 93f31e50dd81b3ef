//! Job submission and polling

use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use futures::FutureExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, info};

use super::{JobKey, JobRecord, JobStore};
use crate::charts::ChartStore;
use crate::conversation::AttemptOutcome;
use crate::error::{Error, Result};

/// The work a job performs. Charts go through the given store, which points
/// at the job's directory.
#[async_trait]
pub trait JobRunner: Send + Sync + 'static {
    type Input: Send + 'static;

    async fn run(&self, input: Self::Input, charts: ChartStore) -> Result<AttemptOutcome>;
}

/// Runs jobs in the background and answers status/result queries from the
/// persisted records
pub struct JobTracker<R: JobRunner> {
    store: JobStore,
    runner: Arc<R>,
    chart_prefix: String,
    tasks: Mutex<HashMap<JobKey, JoinHandle<()>>>,
}

impl<R: JobRunner> JobTracker<R> {
    pub fn new(store: JobStore, runner: Arc<R>, chart_prefix: impl Into<String>) -> Self {
        Self {
            store,
            runner,
            chart_prefix: chart_prefix.into(),
            tasks: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &JobStore {
        &self.store
    }

    /// Record the job as pending and start it without waiting for it.
    ///
    /// Rejected while an earlier run of the same key is still going.
    pub async fn submit(&self, key: JobKey, input: R::Input) -> Result<()> {
        let mut tasks = self.tasks.lock().await;
        tasks.retain(|_, handle| !handle.is_finished());

        if tasks.contains_key(&key) {
            return Err(Error::JobInFlight(key.to_string()));
        }

        self.store.reset(&key)?;
        self.store.write_status(&key, &JobRecord::pending())?;
        info!(job = %key, "Job submitted");

        let store = self.store.clone();
        let runner = self.runner.clone();
        let charts = ChartStore::new(store.job_dir(&key), self.chart_prefix.clone());
        let task_key = key.clone();

        let handle = tokio::spawn(async move {
            run_job(store, runner, task_key, input, charts).await;
        });
        tasks.insert(key, handle);

        Ok(())
    }

    /// The persisted status record, or `None` if the key was never submitted
    pub fn status(&self, key: &JobKey) -> Result<Option<JobRecord>> {
        self.store.read_status(key)
    }

    /// The result markdown, only once the job has completed
    pub fn result(&self, key: &JobKey) -> Result<Option<String>> {
        self.store.completed_result(key)
    }

    /// Wait for a job started by this tracker and return its final record.
    /// A job whose task was already reaped answers from its terminal record.
    pub async fn wait(&self, key: &JobKey) -> Result<JobRecord> {
        let Some(handle) = self.tasks.lock().await.remove(key) else {
            return match self.status(key)? {
                Some(record) if record.status.is_terminal() => Ok(record),
                _ => Err(Error::JobNotFound(key.to_string())),
            };
        };

        if let Err(e) = handle.await {
            error!(job = %key, error = %e, "Job task aborted");
            let started_at = self
                .store
                .read_status(key)?
                .map(|record| record.started_at)
                .unwrap_or_else(Utc::now);
            self.store
                .write_status(key, &JobRecord::failed(started_at, format!("Job task aborted: {}", e)))?;
        }

        self.status(key)?.ok_or_else(|| Error::JobNotFound(key.to_string()))
    }
}

async fn run_job<R: JobRunner>(store: JobStore, runner: Arc<R>, key: JobKey, input: R::Input, charts: ChartStore) {
    let started = JobRecord::in_progress();
    if let Err(e) = store.write_status(&key, &started) {
        error!(job = %key, error = %e, "Failed to record job start");
    }
    info!(job = %key, "Job in progress");

    let outcome = AssertUnwindSafe(runner.run(input, charts)).catch_unwind().await;
    let record = match outcome {
        Ok(Ok(outcome)) => match store.write_result(&key, &render_result(&outcome)) {
            Ok(()) => {
                info!(
                    job = %key,
                    attempts = outcome.attempts,
                    charts = outcome.charts_saved.len(),
                    "Job completed"
                );
                JobRecord::completed(started.started_at)
            }
            Err(e) => {
                error!(job = %key, error = %e, "Failed to write job result");
                JobRecord::failed(started.started_at, e.to_string())
            }
        },
        Ok(Err(e)) => {
            error!(job = %key, error = %e, "Job failed");
            JobRecord::failed(started.started_at, e.to_string())
        }
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            error!(job = %key, panic = %message, "Job task panicked");
            JobRecord::failed(started.started_at, format!("Job task panicked: {}", message))
        }
    };

    if let Err(e) = store.write_status(&key, &record) {
        error!(job = %key, error = %e, "Failed to record job outcome");
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Final response, followed by a `## Charts` section listing the charts of
/// the final attempt
pub fn render_result(outcome: &AttemptOutcome) -> String {
    let mut markdown = outcome.response.trim_end().to_string();
    markdown.push('\n');

    if !outcome.charts_saved.is_empty() {
        markdown.push_str("\n## Charts\n\n");
        for name in &outcome.charts_saved {
            markdown.push_str(&format!("![{}]({})\n", name, name));
        }
    }

    markdown
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::jobs::JobStatus;

    struct EchoRunner;

    #[async_trait]
    impl JobRunner for EchoRunner {
        type Input = &'static str;

        async fn run(&self, response: &'static str, _charts: ChartStore) -> Result<AttemptOutcome> {
            Ok(AttemptOutcome {
                response: response.to_string(),
                charts_saved: vec![],
                attempts: 1,
            })
        }
    }

    #[tokio::test]
    async fn test_submit_drops_finished_handles() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = JobTracker::new(JobStore::new(dir.path()), Arc::new(EchoRunner), "nfl-analysis");
        let first = JobKey::new("first").unwrap();
        let second = JobKey::new("second").unwrap();

        tracker.submit(first.clone(), "one").await.unwrap();
        while !tracker.status(&first).unwrap().is_some_and(|r| r.status.is_terminal()) {
            tokio::task::yield_now().await;
        }
        tracker.submit(second.clone(), "two").await.unwrap();

        {
            let tasks = tracker.tasks.lock().await;
            assert_eq!(tasks.len(), 1);
            assert!(tasks.contains_key(&second));
        }

        assert_eq!(tracker.wait(&first).await.unwrap().status, JobStatus::Completed);
        assert_eq!(tracker.wait(&second).await.unwrap().status, JobStatus::Completed);
        assert!(tracker.tasks.lock().await.is_empty());
    }

    #[test]
    fn test_render_without_charts() {
        let outcome = AttemptOutcome {
            response: "Take the under.\n\n".to_string(),
            charts_saved: vec![],
            attempts: 4,
        };
        assert_eq!(render_result(&outcome), "Take the under.\n");
    }

    #[test]
    fn test_render_lists_charts_in_order() {
        let outcome = AttemptOutcome {
            response: "# Analysis".to_string(),
            charts_saved: vec!["nfl-analysis-0.png".to_string(), "nfl-analysis-1.png".to_string()],
            attempts: 1,
        };
        assert_eq!(
            render_result(&outcome),
            "# Analysis\n\n## Charts\n\n![nfl-analysis-0.png](nfl-analysis-0.png)\n![nfl-analysis-1.png](nfl-analysis-1.png)\n"
        );
    }
}
