//! Linesmith Core Library
//!
//! This crate provides the core functionality for Linesmith, a research agent
//! that drives a language model through web search and sandboxed code
//! execution until it produces a charted matchup analysis.
//!
//! The pieces, bottom-up:
//! - [`tools`]: argument recovery, the per-attempt execution quota, and the
//!   dispatcher that turns tool calls into model-visible results
//! - [`conversation`]: the model/tool loop and the retry wrapper
//! - [`jobs`]: background job lifecycle with persisted status records
//! - [`analysis`]: the wiring for one matchup analysis

pub mod analysis;
pub mod charts;
pub mod config;
pub mod conversation;
pub mod error;
pub mod jobs;
pub mod prompts;
pub mod provider;
pub mod tools;

pub use analysis::{AnalysisRunner, BettingAnalyst, Matchup};
pub use charts::{ChartArtifact, ChartStore};
pub use config::{Config, ConfigManager};
pub use conversation::{AttemptOutcome, ConversationEngine, Message, RetryOrchestrator, ToolCallRecord};
pub use error::{Error, Result};
pub use jobs::{JobKey, JobRecord, JobRunner, JobStatus, JobStore, JobTracker};
pub use provider::{Completion, ModelClient};
pub use tools::{CodeExecutor, ExecutionQuota, ToolDefinition, ToolDispatcher, ToolOutput, ToolProvider};
