//! Model completion providers

pub mod genai_provider;
pub mod logging;

use async_trait::async_trait;

use crate::conversation::{Message, ToolCallRecord};
use crate::error::Result;
use crate::tools::ToolDefinition;

pub use genai_provider::GenAIProvider;

/// Response from one model round
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Completion {
    /// Text content (may be present even with tool calls)
    pub content: Option<String>,
    /// Requested tool calls in the order the model issued them
    pub tool_calls: Vec<ToolCallRecord>,
}

impl Completion {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            tool_calls: Vec::new(),
        }
    }

    pub fn tool_calls(calls: Vec<ToolCallRecord>) -> Self {
        Self {
            content: None,
            tool_calls: calls,
        }
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// A language model that can request tool calls
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn complete(&self, messages: &[Message], tools: &[ToolDefinition]) -> Result<Completion>;
}
