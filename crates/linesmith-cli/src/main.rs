//! Linesmith CLI - NFL matchup betting analysis from the command line
//!
//! `analyze` and `submit` drive a full agent run in this process;
//! `status` and `result` only read the job records on disk.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use console::style;
use tracing_subscriber::EnvFilter;

use linesmith_core::config::{Config, ConfigManager};
use linesmith_core::jobs::{JobKey, JobRecord, JobStatus, JobStore};
use linesmith_core::tools::{McpToolProvider, ToolProvider, build_catalog};
use linesmith_core::{BettingAnalyst, Matchup};

#[derive(Parser)]
#[command(name = "linesmith")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Research an NFL matchup and write a betting analysis with charts", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to the user config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding job records, overriding the config file
    #[arg(long, global = true)]
    results_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a matchup and print the result
    Analyze(MatchupArgs),

    /// Start an analysis job and report its status until it finishes
    Submit {
        #[command(flatten)]
        matchup: MatchupArgs,

        /// Seconds between status checks
        #[arg(long, default_value_t = 5)]
        poll_secs: u64,
    },

    /// Show the status record of a job
    Status(MatchupArgs),

    /// Print the analysis of a completed job
    Result(MatchupArgs),

    /// List the tools offered to the model
    Tools,

    /// Show configuration
    Config {
        /// Write the current configuration to the config file
        #[arg(long)]
        init: bool,
    },
}

#[derive(Args, Clone)]
struct MatchupArgs {
    /// Home team
    #[arg(long)]
    home: String,

    /// Away team
    #[arg(long)]
    away: String,

    /// Week of the season
    #[arg(long)]
    week: u32,
}

impl MatchupArgs {
    fn matchup(&self) -> Matchup {
        Matchup::new(&self.home, &self.away, self.week)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over --verbose
    let default_filter = if cli.verbose { "info,linesmith_core=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .with_writer(std::io::stderr)
        .init();

    let mut manager = match &cli.config {
        Some(path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    }
    .context("Failed to load configuration")?;

    if let Some(dir) = &cli.results_dir {
        manager.config_mut().agent.results_dir = dir.clone();
    }

    match cli.command {
        Commands::Analyze(args) => run_analyze(manager.config(), &args.matchup()).await?,
        Commands::Submit { matchup, poll_secs } => {
            run_submit(manager.config(), &matchup.matchup(), Duration::from_secs(poll_secs.max(1))).await?
        }
        Commands::Status(args) => show_status(manager.config(), &args.matchup())?,
        Commands::Result(args) => show_result(manager.config(), &args.matchup())?,
        Commands::Tools => show_tools(manager.config()).await?,
        Commands::Config { init } => show_config(&manager, init)?,
    }

    Ok(())
}

async fn run_analyze(config: &Config, matchup: &Matchup) -> anyhow::Result<()> {
    ensure_api_key(config);

    let analyst = BettingAnalyst::connect(config).await?;
    let outcome = analyst.analyze(matchup).await;
    if let Err(e) = analyst.close().await {
        tracing::warn!("Failed to shut down collaborators: {}", e);
    }

    let markdown = outcome?;
    println!("{}", markdown);

    let key = matchup.job_key()?;
    eprintln!(
        "{} {}",
        style("Saved to").dim(),
        style(JobStore::new(&config.agent.results_dir).result_path(&key).display()).green()
    );
    Ok(())
}

async fn run_submit(config: &Config, matchup: &Matchup, poll: Duration) -> anyhow::Result<()> {
    ensure_api_key(config);

    let analyst = BettingAnalyst::connect(config).await?;
    let key = matchup.job_key()?;
    analyst.tracker().submit(key.clone(), matchup.clone()).await?;
    println!("{} {}", style("Submitted").bold(), style(&key).cyan());

    let mut last = None;
    let record = loop {
        if let Some(record) = analyst.tracker().status(&key)? {
            if last != Some(record.status) {
                print_record(&key, &record);
                last = Some(record.status);
            }
            if record.status.is_terminal() {
                break record;
            }
        }
        tokio::time::sleep(poll).await;
    };

    // Reap the task so a panic is recorded before we exit
    analyst.tracker().wait(&key).await?;
    if let Err(e) = analyst.close().await {
        tracing::warn!("Failed to shut down collaborators: {}", e);
    }

    if record.status == JobStatus::Completed {
        println!(
            "Result: {}",
            style(analyst.tracker().store().result_path(&key).display()).green()
        );
    }
    Ok(())
}

fn show_status(config: &Config, matchup: &Matchup) -> anyhow::Result<()> {
    let store = JobStore::new(&config.agent.results_dir);
    let key = matchup.job_key()?;

    match store.read_status(&key)? {
        Some(record) => println!("{}", serde_json::to_string_pretty(&record)?),
        None => anyhow::bail!("No job found for {}", key),
    }
    Ok(())
}

fn show_result(config: &Config, matchup: &Matchup) -> anyhow::Result<()> {
    let store = JobStore::new(&config.agent.results_dir);
    let key = matchup.job_key()?;

    match store.completed_result(&key)? {
        Some(markdown) => print!("{}", markdown),
        None => {
            let status = store
                .read_status(&key)?
                .map(|record| record.status.to_string())
                .unwrap_or_else(|| "not found".to_string());
            anyhow::bail!("No result for {} (status: {})", key, status);
        }
    }
    Ok(())
}

async fn show_tools(config: &Config) -> anyhow::Result<()> {
    let provider = McpToolProvider::connect(&config.mcp).await?;
    let listed = provider.list_tools().await;
    if let Err(e) = provider.close().await {
        tracing::warn!("Failed to close tool provider: {}", e);
    }

    println!("{}", style("Available Tools:").bold());
    println!();
    for tool in build_catalog(listed?) {
        let summary = tool.description.lines().next().unwrap_or_default();
        println!("  {:<20} {}", style(&tool.name).cyan(), summary);
    }
    Ok(())
}

fn show_config(manager: &ConfigManager, init: bool) -> anyhow::Result<()> {
    if init {
        manager.save()?;
        println!("Wrote {}", style(manager.config_path().display()).green());
        return Ok(());
    }

    let config = manager.config();
    println!("{}", style("Configuration:").bold());
    println!();
    println!("  Config file: {}", style(manager.config_path().display()).dim());
    println!("  Model: {}", style(config.provider.model_id()).green());
    println!(
        "  API key: {}",
        if config.provider.get_api_key().is_some() {
            style("configured").green()
        } else {
            style("missing").red()
        }
    );
    println!("  Results: {}", config.agent.results_dir.display());
    println!();
    println!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

fn print_record(key: &JobKey, record: &JobRecord) {
    let status = match record.status {
        JobStatus::Pending => style(record.status.as_str()).dim(),
        JobStatus::InProgress => style(record.status.as_str()).yellow(),
        JobStatus::Completed => style(record.status.as_str()).green(),
        JobStatus::Failed => style(record.status.as_str()).red().bold(),
    };
    println!("  {} {}", style(key).cyan(), status);
    if let Some(error) = &record.error {
        println!("    {}", style(error).red());
    }
}

fn ensure_api_key(config: &Config) {
    if config.provider.get_api_key().is_none() {
        let env = config.provider.api_key_env.as_deref().unwrap_or("the provider API key variable");
        eprintln!(
            "{}",
            style(format!("Warning: no API key configured; set {} or provider.api_key", env)).yellow()
        );
    }
}
