//! Matchup analysis: prompts, tools, and retry policy wired together

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::charts::ChartStore;
use crate::config::{AgentConfig, Config};
use crate::conversation::{AttemptOutcome, ConversationEngine, RetryOrchestrator};
use crate::error::{Error, Result};
use crate::jobs::{JobKey, JobRunner, JobStatus, JobStore, JobTracker};
use crate::prompts;
use crate::provider::ModelClient;
use crate::tools::{CodeExecutor, ToolDefinition, ToolProvider, build_catalog};

/// The game being analyzed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Matchup {
    pub home_team: String,
    pub away_team: String,
    pub week: u32,
}

impl Matchup {
    pub fn new(home_team: impl Into<String>, away_team: impl Into<String>, week: u32) -> Self {
        Self {
            home_team: home_team.into(),
            away_team: away_team.into(),
            week,
        }
    }

    /// `<home>--vs--<away>--week-<n>`, each team slugged on its own
    pub fn job_key(&self) -> Result<JobKey> {
        let week = format!("week {}", self.week);
        JobKey::from_parts(&[self.home_team.as_str(), "vs", self.away_team.as_str(), week.as_str()])
    }
}

/// Runs the retrying conversation for one matchup
pub struct AnalysisRunner {
    model: Arc<dyn ModelClient>,
    provider: Arc<dyn ToolProvider>,
    executor: Arc<dyn CodeExecutor>,
    tools: Arc<[ToolDefinition]>,
    agent: AgentConfig,
    search_tool: String,
}

impl AnalysisRunner {
    /// Fetch the provider's tools once and build the catalog
    pub async fn prepare(
        model: Arc<dyn ModelClient>,
        provider: Arc<dyn ToolProvider>,
        executor: Arc<dyn CodeExecutor>,
        agent: AgentConfig,
        search_tool: impl Into<String>,
    ) -> Result<Self> {
        let provider_tools = provider.list_tools().await?;
        let tools = build_catalog(provider_tools);
        info!(
            tools = ?tools.iter().map(|t| t.name.as_str()).collect::<Vec<_>>(),
            "Tool catalog ready"
        );

        Ok(Self {
            model,
            provider,
            executor,
            tools: tools.into(),
            agent,
            search_tool: search_tool.into(),
        })
    }

    pub fn tools(&self) -> &[ToolDefinition] {
        &self.tools
    }

    pub async fn analyze(&self, matchup: &Matchup, charts: ChartStore) -> Result<AttemptOutcome> {
        let engine = ConversationEngine::new(self.model.clone(), self.tools.clone())
            .with_max_rounds(self.agent.max_rounds);
        let orchestrator = RetryOrchestrator::new(engine, self.provider.clone(), self.executor.clone(), charts)
            .with_max_retries(self.agent.max_retries)
            .with_max_code_executions(self.agent.max_code_executions);

        let system = prompts::system_prompt(&self.search_tool);
        let user = prompts::user_prompt(matchup, &self.search_tool);
        orchestrator.run(&system, &user).await
    }
}

#[async_trait]
impl JobRunner for AnalysisRunner {
    type Input = Matchup;

    async fn run(&self, input: Matchup, charts: ChartStore) -> Result<AttemptOutcome> {
        self.analyze(&input, charts).await
    }
}

/// Owns the collaborators and a job tracker for analyses
pub struct BettingAnalyst {
    tracker: JobTracker<AnalysisRunner>,
    runner: Arc<AnalysisRunner>,
    provider: Arc<dyn ToolProvider>,
    executor: Arc<dyn CodeExecutor>,
}

impl BettingAnalyst {
    /// Start the MCP server, the sandbox, and the model client from config
    #[cfg(all(feature = "mcp", feature = "sandbox"))]
    pub async fn connect(config: &Config) -> Result<Self> {
        use tracing::warn;

        use crate::provider::GenAIProvider;
        use crate::tools::{McpToolProvider, SandboxExecutor};

        let model: Arc<dyn ModelClient> = Arc::new(GenAIProvider::from_config(&config.provider));
        let provider: Arc<dyn ToolProvider> = Arc::new(McpToolProvider::connect(&config.mcp).await?);
        let executor: Arc<dyn CodeExecutor> =
            match SandboxExecutor::create(config.sandbox.to_sandbox_config()).await {
                Ok(executor) => Arc::new(executor),
                Err(e) => {
                    if let Err(close_err) = provider.close().await {
                        warn!("Failed to close tool provider: {}", close_err);
                    }
                    return Err(e);
                }
            };

        Self::assemble(model, provider, executor, config).await
    }

    pub async fn assemble(
        model: Arc<dyn ModelClient>,
        provider: Arc<dyn ToolProvider>,
        executor: Arc<dyn CodeExecutor>,
        config: &Config,
    ) -> Result<Self> {
        let runner = Arc::new(
            AnalysisRunner::prepare(
                model,
                provider.clone(),
                executor.clone(),
                config.agent.clone(),
                config.mcp.search_tool.clone(),
            )
            .await?,
        );
        let tracker = JobTracker::new(
            JobStore::new(&config.agent.results_dir),
            runner.clone(),
            config.agent.chart_prefix.clone(),
        );

        Ok(Self {
            tracker,
            runner,
            provider,
            executor,
        })
    }

    pub fn tools(&self) -> &[ToolDefinition] {
        self.runner.tools()
    }

    pub fn tracker(&self) -> &JobTracker<AnalysisRunner> {
        &self.tracker
    }

    /// Run one analysis to completion and return its markdown
    pub async fn analyze(&self, matchup: &Matchup) -> Result<String> {
        let key = matchup.job_key()?;
        self.tracker.submit(key.clone(), matchup.clone()).await?;
        let record = self.tracker.wait(&key).await?;

        match record.status {
            JobStatus::Completed => self
                .tracker
                .result(&key)?
                .ok_or_else(|| Error::JobNotFound(key.to_string())),
            _ => Err(Error::Agent(
                record.error.unwrap_or_else(|| format!("Job {} ended as {}", key, record.status)),
            )),
        }
    }

    /// Shut down the tool provider and the executor
    pub async fn close(&self) -> Result<()> {
        let provider = self.provider.close().await;
        let executor = self.executor.close().await;
        provider.and(executor)
    }
}
