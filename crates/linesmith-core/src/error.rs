//! Error types for Linesmith Core

use thiserror::Error;

/// Result type alias using Linesmith Error
pub type Result<T> = std::result::Result<T, Error>;

/// Engine-level errors
///
/// Tool failures never show up here; they are reported to the model as
/// tool results. Anything in this enum ends the current job.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Agent error: {0}")]
    Agent(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Conversation exceeded {0} model rounds without a final answer")]
    RoundLimit(usize),

    #[error("Job {0} is still running")]
    JobInFlight(String),

    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
