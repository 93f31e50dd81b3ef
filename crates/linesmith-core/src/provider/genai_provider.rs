//! GenAI-based model provider
//!
//! Uses the genai framework with manual tool control: the conversation
//! engine decides what to do with every tool call, genai only carries the
//! request and streams the response back.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use genai::chat::{ChatMessage, ChatRequest, ChatStreamEvent, Tool, ToolCall, ToolResponse};
use genai::resolver::{AuthData, AuthResolver};
use genai::{Client, WebConfig};
use serde_json::Value;
use tracing::{debug, error};

use super::logging::{LogConfig, log_llm_interaction};
use super::{Completion, ModelClient};
use crate::config::ProviderConfig;
use crate::conversation::{Message, ToolCallRecord};
use crate::error::{Error, Result};
use crate::tools::ToolDefinition;

/// A provider implementation using genai
pub struct GenAIProvider {
    client: Client,
    model: String,
}

impl GenAIProvider {
    /// Default timeout for LLM API requests (5 minutes)
    const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

    fn default_web_config() -> WebConfig {
        WebConfig::default()
            .with_timeout(Self::DEFAULT_TIMEOUT)
            .with_connect_timeout(Duration::from_secs(30))
    }

    /// Create a provider that resolves credentials from genai's default
    /// environment variables
    pub fn new(model: impl Into<String>) -> Self {
        let client = Client::builder().with_web_config(Self::default_web_config()).build();
        Self {
            client,
            model: model.into(),
        }
    }

    /// Create a provider with a specific API key
    pub fn with_api_key(model: impl Into<String>, api_key: &str) -> Self {
        let api_key = api_key.to_string();
        let auth_resolver = AuthResolver::from_resolver_fn(
            move |_model_iden| -> std::result::Result<Option<AuthData>, genai::resolver::Error> {
                Ok(Some(AuthData::from_single(api_key.clone())))
            },
        );

        let client = Client::builder()
            .with_web_config(Self::default_web_config())
            .with_auth_resolver(auth_resolver)
            .build();

        Self {
            client,
            model: model.into(),
        }
    }

    pub fn from_config(config: &ProviderConfig) -> Self {
        match config.get_api_key() {
            Some(key) => Self::with_api_key(config.model_id(), &key),
            None => Self::new(config.model_id()),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_request(messages: &[Message], tools: &[ToolDefinition]) -> ChatRequest {
        let mut chat_req = ChatRequest::default();

        for message in messages {
            chat_req = match message {
                Message::System { content } => chat_req.with_system(content.as_str()),
                Message::User { content } => chat_req.append_message(ChatMessage::user(content.as_str())),
                Message::Assistant { content, tool_calls } if tool_calls.is_empty() => {
                    chat_req.append_message(ChatMessage::assistant(content.as_str()))
                }
                // Tool calls go out as a single assistant message; any text
                // next to them is not resent
                Message::Assistant { tool_calls, .. } => {
                    let calls: Vec<ToolCall> = tool_calls.iter().map(to_genai_call).collect();
                    chat_req.append_message(calls)
                }
                Message::Tool { call_id, content } => {
                    chat_req.append_message(ToolResponse::new(call_id.clone(), content.clone()))
                }
            };
        }

        if !tools.is_empty() {
            let genai_tools: Vec<Tool> = tools
                .iter()
                .map(|t| {
                    Tool::new(&t.name)
                        .with_description(&t.description)
                        .with_schema(t.parameters.clone())
                })
                .collect();
            chat_req = chat_req.with_tools(genai_tools);
        }

        chat_req
    }

    async fn stream_completion(&self, chat_req: ChatRequest) -> Result<Completion> {
        let stream_response = self
            .client
            .exec_chat_stream(&self.model, chat_req, None)
            .await
            .map_err(|e| Error::Provider(format!("GenAI error: {:?}", e)))?;

        let mut content = String::new();
        let mut tool_calls = Vec::new();
        let mut stream = stream_response.stream;

        while let Some(event) = stream.next().await {
            match event {
                Ok(ChatStreamEvent::Chunk(chunk)) => content.push_str(&chunk.content),
                Ok(ChatStreamEvent::ToolCallChunk(tc)) => tool_calls.push(from_genai_call(tc.tool_call)),
                Ok(ChatStreamEvent::ReasoningChunk(chunk)) => {
                    debug!(len = chunk.content.len(), "Reasoning chunk");
                }
                Ok(ChatStreamEvent::End(_)) => break,
                Ok(ChatStreamEvent::Start) | Ok(ChatStreamEvent::ThoughtSignatureChunk(_)) => {}
                Err(e) => return Err(Error::Provider(format!("GenAI stream error: {:?}", e))),
            }
        }

        Ok(Completion {
            content: if content.is_empty() { None } else { Some(content) },
            tool_calls,
        })
    }
}

#[async_trait]
impl ModelClient for GenAIProvider {
    async fn complete(&self, messages: &[Message], tools: &[ToolDefinition]) -> Result<Completion> {
        let chat_req = Self::build_request(messages, tools);
        let result = self.stream_completion(chat_req).await;

        match &result {
            Ok(completion) => {
                debug!(
                    model = %self.model,
                    tool_calls = completion.tool_calls.len(),
                    "Model round complete"
                );
                log_llm_interaction(LogConfig {
                    model: &self.model,
                    messages,
                    tools,
                    result: Some(completion),
                    error: None,
                });
            }
            Err(e) => {
                error!(error = %e, model = %self.model, "LLM request failed");
                let message = e.to_string();
                log_llm_interaction(LogConfig {
                    model: &self.model,
                    messages,
                    tools,
                    result: None,
                    error: Some(&message),
                });
            }
        }

        result
    }
}

fn to_genai_call(call: &ToolCallRecord) -> ToolCall {
    let fn_arguments =
        serde_json::from_str(&call.arguments).unwrap_or_else(|_| Value::String(call.arguments.clone()));
    ToolCall {
        call_id: call.call_id.clone(),
        fn_name: call.name.clone(),
        fn_arguments,
        thought_signatures: None,
    }
}

fn from_genai_call(call: ToolCall) -> ToolCallRecord {
    let arguments = match call.fn_arguments {
        Value::String(raw) => raw,
        other => other.to_string(),
    };
    ToolCallRecord {
        call_id: call.call_id,
        name: call.fn_name,
        arguments,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_raw_string_arguments_are_kept_verbatim() {
        let call = ToolCall {
            call_id: "c1".to_string(),
            fn_name: "run_python_code".to_string(),
            fn_arguments: Value::String("{\"code\": \"print(\n1)\"}".to_string()),
            thought_signatures: None,
        };
        let record = from_genai_call(call);
        assert_eq!(record.arguments, "{\"code\": \"print(\n1)\"}");
    }

    #[test]
    fn test_structured_arguments_are_serialized() {
        let call = ToolCall {
            call_id: "c2".to_string(),
            fn_name: "brave_web_search".to_string(),
            fn_arguments: json!({ "query": "odds" }),
            thought_signatures: None,
        };
        let record = from_genai_call(call);
        assert_eq!(serde_json::from_str::<Value>(&record.arguments).unwrap(), json!({ "query": "odds" }));
    }

    #[test]
    fn test_unparseable_arguments_round_trip_as_string() {
        let record = ToolCallRecord::new("c3", "run_python_code", "not json");
        let call = to_genai_call(&record);
        assert_eq!(call.fn_arguments, Value::String("not json".to_string()));
    }
}
