//! Model/tool loop for one attempt

use std::sync::Arc;

use tracing::{debug, info};

use super::transcript::{Message, Transcript};
use crate::error::{Error, Result};
use crate::provider::ModelClient;
use crate::tools::{ToolDefinition, ToolDispatcher};

/// Default cap on model rounds per attempt
pub const DEFAULT_MAX_ROUNDS: usize = 25;

/// What a finished attempt produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineOutcome {
    /// Text of the final model response
    pub response: String,
    /// Chart files saved during the attempt
    pub charts_saved: Vec<String>,
    /// Model rounds used
    pub rounds: usize,
}

/// Drives the model until it answers without requesting tools.
///
/// Tool calls of one round are dispatched one after another and their
/// results appended in call order.
pub struct ConversationEngine {
    model: Arc<dyn ModelClient>,
    tools: Arc<[ToolDefinition]>,
    max_rounds: usize,
}

impl ConversationEngine {
    pub fn new(model: Arc<dyn ModelClient>, tools: impl Into<Arc<[ToolDefinition]>>) -> Self {
        Self {
            model,
            tools: tools.into(),
            max_rounds: DEFAULT_MAX_ROUNDS,
        }
    }

    /// At least one round is always allowed
    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds.max(1);
        self
    }

    pub fn max_rounds(&self) -> usize {
        self.max_rounds
    }

    pub fn tools(&self) -> &[ToolDefinition] {
        &self.tools
    }

    /// Run to completion. Model failures and the round cap are errors;
    /// tool failures are fed back to the model.
    pub async fn run(&self, transcript: &mut Transcript, dispatcher: &mut ToolDispatcher) -> Result<EngineOutcome> {
        let mut rounds = 0;

        loop {
            if rounds >= self.max_rounds {
                return Err(Error::RoundLimit(self.max_rounds));
            }
            rounds += 1;

            let completion = self.model.complete(transcript.messages(), &self.tools).await?;

            if !completion.has_tool_calls() {
                info!(rounds, charts = dispatcher.charts_saved().len(), "Conversation finished");
                return Ok(EngineOutcome {
                    response: completion.content.unwrap_or_default(),
                    charts_saved: dispatcher.charts_saved().to_vec(),
                    rounds,
                });
            }

            debug!(round = rounds, calls = completion.tool_calls.len(), "Model requested tools");

            let calls = completion.tool_calls;
            transcript.push(Message::Assistant {
                content: completion.content.unwrap_or_default(),
                tool_calls: calls.clone(),
            });

            for call in &calls {
                let result = dispatcher.dispatch(call).await;
                transcript.push(Message::Tool {
                    call_id: call.call_id.clone(),
                    content: result.to_content(),
                });
            }
        }
    }
}
