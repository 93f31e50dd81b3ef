//! Tool call dispatch for one conversation attempt

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use super::arguments::{extract_code, parse_structured_arguments};
use super::catalog::CODE_TOOL_NAME;
use super::executor::CodeExecutor;
use super::provider::ToolProvider;
use super::quota::ExecutionQuota;
use super::ToolOutput;
use crate::charts::ChartStore;
use crate::conversation::ToolCallRecord;

/// What a tool call produced
#[derive(Debug, Clone, PartialEq)]
pub enum ToolResult {
    /// Envelope built by the dispatcher
    Output(ToolOutput),
    /// Provider result forwarded as-is
    Provider(Value),
}

impl ToolResult {
    /// Tool-result message content
    pub fn to_content(&self) -> String {
        match self {
            ToolResult::Output(output) => output.to_value().to_string(),
            ToolResult::Provider(value) => value.to_string(),
        }
    }

    pub fn output(&self) -> Option<&ToolOutput> {
        match self {
            ToolResult::Output(output) => Some(output),
            ToolResult::Provider(_) => None,
        }
    }
}

/// Routes tool calls to the code executor or the tool provider.
///
/// Built fresh for every attempt; the quota and the list of saved charts
/// live and die with it.
pub struct ToolDispatcher {
    provider: Arc<dyn ToolProvider>,
    executor: Arc<dyn CodeExecutor>,
    charts: ChartStore,
    quota: ExecutionQuota,
    saved: Vec<String>,
}

impl ToolDispatcher {
    pub fn new(
        provider: Arc<dyn ToolProvider>,
        executor: Arc<dyn CodeExecutor>,
        charts: ChartStore,
        max_code_executions: usize,
    ) -> Self {
        Self {
            provider,
            executor,
            charts,
            quota: ExecutionQuota::new(max_code_executions),
            saved: Vec::new(),
        }
    }

    pub fn quota(&self) -> &ExecutionQuota {
        &self.quota
    }

    /// Chart files written during this attempt, in save order
    pub fn charts_saved(&self) -> &[String] {
        &self.saved
    }

    pub fn into_charts_saved(self) -> Vec<String> {
        self.saved
    }

    /// Dispatch one call. Never fails.
    pub async fn dispatch(&mut self, call: &ToolCallRecord) -> ToolResult {
        debug!(tool = %call.name, call_id = %call.call_id, "Dispatching tool call");

        if call.name == CODE_TOOL_NAME {
            ToolResult::Output(self.run_code(&call.arguments).await)
        } else {
            self.call_provider(&call.name, &call.arguments).await
        }
    }

    async fn run_code(&mut self, raw_arguments: &str) -> ToolOutput {
        if self.quota.is_exhausted() {
            warn!(used = self.quota.used(), max = self.quota.max(), "Code execution quota exhausted");
            return ToolOutput::error(format!(
                "Python code execution limit reached. You can only call {} {}.",
                CODE_TOOL_NAME,
                times(self.quota.max())
            ));
        }

        let Some(code) = extract_code(raw_arguments) else {
            warn!("No code found in {} arguments", CODE_TOOL_NAME);
            return ToolOutput::error("No Python code found in arguments");
        };

        self.quota.record();
        debug!(%code, "Executing code");

        let run = match self.executor.execute(&code).await {
            Ok(run) => run,
            Err(e) => {
                warn!("Code executor failed: {}", e);
                return ToolOutput::error(e.to_string());
            }
        };

        if !run.success {
            return ToolOutput {
                success: false,
                error: Some(run.error.unwrap_or_else(|| "Execution failed".to_string())),
                traceback: run.traceback,
                ..Default::default()
            };
        }

        if run.charts.is_empty() {
            return ToolOutput::success()
                .with_stdout(run.stdout)
                .with_message("Code executed but no charts were generated. Did you use plt.savefig()?");
        }

        match self.charts.save(&run.charts, self.saved.len()).await {
            Ok(files) => {
                info!(count = files.len(), "Charts saved");
                self.saved.extend(files.iter().cloned());
                let message = format!(
                    "Code executed successfully! Generated {} chart(s): {}",
                    files.len(),
                    files.join(", ")
                );
                ToolOutput::success()
                    .with_stdout(run.stdout)
                    .with_charts(files)
                    .with_message(message)
            }
            Err(e) => {
                warn!("Failed to save charts: {}", e);
                ToolOutput::error(format!("Failed to save charts: {}", e)).with_stdout(run.stdout)
            }
        }
    }

    async fn call_provider(&self, name: &str, raw_arguments: &str) -> ToolResult {
        let arguments = match parse_structured_arguments(raw_arguments) {
            Ok(arguments) => arguments,
            Err(e) => {
                warn!(tool = name, "Unparseable tool arguments: {}", e);
                return ToolResult::Output(ToolOutput::error(format!(
                    "Failed to parse MCP tool arguments: {}",
                    e
                )));
            }
        };

        match self.provider.call_tool(name, arguments).await {
            Ok(value) => ToolResult::Provider(value),
            Err(e) => {
                warn!(tool = name, "Tool provider call failed: {}", e);
                ToolResult::Output(ToolOutput::error(e.to_string()))
            }
        }
    }
}

fn times(n: usize) -> String {
    match n {
        1 => "once".to_string(),
        2 => "twice".to_string(),
        n => format!("{} times", n),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_times_phrasing() {
        assert_eq!(times(1), "once");
        assert_eq!(times(2), "twice");
        assert_eq!(times(0), "0 times");
        assert_eq!(times(5), "5 times");
    }

    #[test]
    fn test_provider_result_content_is_verbatim() {
        let value = serde_json::json!({ "content": [{ "type": "text", "text": "odds" }] });
        let result = ToolResult::Provider(value.clone());
        assert_eq!(result.to_content(), value.to_string());
        assert!(result.output().is_none());
    }
}
