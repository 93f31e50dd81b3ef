//! Fresh-context retries until an attempt produces a chart

use std::sync::Arc;

use tracing::{info, warn};

use super::engine::ConversationEngine;
use super::transcript::Transcript;
use crate::charts::ChartStore;
use crate::error::Result;
use crate::tools::{CodeExecutor, ToolDispatcher, ToolProvider};

/// Result of the last attempt that ran
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttemptOutcome {
    pub response: String,
    /// Charts saved by this attempt only
    pub charts_saved: Vec<String>,
    /// Number of attempts made, including this one
    pub attempts: usize,
}

impl AttemptOutcome {
    pub fn produced_charts(&self) -> bool {
        !self.charts_saved.is_empty()
    }
}

/// User prompt for attempt `attempt` (zero-based)
pub fn attempt_prompt(user_prompt: &str, attempt: usize) -> String {
    if attempt == 0 {
        return user_prompt.to_string();
    }
    format!(
        "{}\n\n[Attempt {}] Previous attempt failed to generate charts. Please try again with a different approach to ensure plt.savefig() is called.",
        user_prompt,
        attempt + 1
    )
}

/// Runs up to `max_retries + 1` attempts, each with a new transcript and a
/// new dispatcher
pub struct RetryOrchestrator {
    engine: ConversationEngine,
    provider: Arc<dyn ToolProvider>,
    executor: Arc<dyn CodeExecutor>,
    charts: ChartStore,
    max_retries: usize,
    max_code_executions: usize,
}

impl RetryOrchestrator {
    pub fn new(
        engine: ConversationEngine,
        provider: Arc<dyn ToolProvider>,
        executor: Arc<dyn CodeExecutor>,
        charts: ChartStore,
    ) -> Self {
        Self {
            engine,
            provider,
            executor,
            charts,
            max_retries: 3,
            max_code_executions: 1,
        }
    }

    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_max_code_executions(mut self, max: usize) -> Self {
        self.max_code_executions = max;
        self
    }

    pub async fn run(&self, system_prompt: &str, user_prompt: &str) -> Result<AttemptOutcome> {
        let max_attempts = self.max_retries + 1;
        let mut outcome = AttemptOutcome::default();

        for attempt in 0..max_attempts {
            info!(attempt = attempt + 1, max_attempts, "Starting conversation attempt");

            let mut transcript = Transcript::new(system_prompt, attempt_prompt(user_prompt, attempt));
            let mut dispatcher = ToolDispatcher::new(
                self.provider.clone(),
                self.executor.clone(),
                self.charts.clone(),
                self.max_code_executions,
            );

            let result = self.engine.run(&mut transcript, &mut dispatcher).await?;
            outcome = AttemptOutcome {
                response: result.response,
                charts_saved: result.charts_saved,
                attempts: attempt + 1,
            };

            if outcome.produced_charts() {
                info!(attempt = attempt + 1, charts = outcome.charts_saved.len(), "Attempt produced charts");
                return Ok(outcome);
            }
            warn!(attempt = attempt + 1, "Attempt finished without charts");
        }

        Ok(outcome)
    }
}
