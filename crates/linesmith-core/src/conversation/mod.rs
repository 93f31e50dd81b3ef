//! Conversation loop and retry policy

pub mod engine;
pub mod retry;
pub mod transcript;

pub use engine::{ConversationEngine, DEFAULT_MAX_ROUNDS, EngineOutcome};
pub use retry::{AttemptOutcome, RetryOrchestrator, attempt_prompt};
pub use transcript::{Message, ToolCallRecord, Transcript};
