//! Scripted collaborators shared by the integration tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use linesmith_core::charts::ChartArtifact;
use linesmith_core::conversation::{Message, ToolCallRecord};
use linesmith_core::error::{Error, Result};
use linesmith_core::provider::{Completion, ModelClient};
use linesmith_core::tools::{CodeExecutor, CodeRun, ToolDefinition, ToolProvider};
use serde_json::{Value, json};

/// Replays queued completions and records every transcript it was shown
#[derive(Default)]
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Result<Completion>>>,
    seen: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedModel {
    pub fn new(replies: Vec<Completion>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().map(Ok).collect()),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn push_error(&self, message: &str) {
        self.replies
            .lock()
            .unwrap()
            .push_back(Err(Error::Provider(message.to_string())));
    }

    pub fn seen(&self) -> Vec<Vec<Message>> {
        self.seen.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

#[async_trait]
impl ModelClient for ScriptedModel {
    async fn complete(&self, messages: &[Message], _tools: &[ToolDefinition]) -> Result<Completion> {
        self.seen.lock().unwrap().push(messages.to_vec());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Error::Provider("script exhausted".to_string())))
    }
}

/// Search provider that echoes the query back
#[derive(Default)]
pub struct EchoProvider {
    pub calls: Mutex<Vec<(String, Value)>>,
    pub fail: bool,
}

impl EchoProvider {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ToolProvider for EchoProvider {
    async fn list_tools(&self) -> Result<Vec<ToolDefinition>> {
        Ok(vec![ToolDefinition::from_provider_schema(
            "brave_web_search",
            "Search the web",
            &json!({
                "type": "object",
                "properties": { "query": { "type": "string" } },
                "required": ["query"]
            }),
        )])
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> Result<Value> {
        self.calls.lock().unwrap().push((name.to_string(), arguments.clone()));
        if self.fail {
            return Err(Error::Agent("search backend unavailable".to_string()));
        }
        Ok(json!({
            "content": [{ "type": "text", "text": format!("results for {}", arguments["query"]) }]
        }))
    }
}

/// Code executor returning a fixed outcome and counting invocations
pub struct FakeExecutor {
    outcome: Mutex<Result<CodeRun>>,
    runs: AtomicUsize,
    pub codes: Mutex<Vec<String>>,
}

impl FakeExecutor {
    /// Successful run producing `charts` PNGs
    pub fn with_charts(charts: usize) -> Self {
        Self::from_outcome(Ok(CodeRun {
            success: true,
            stdout: "ok\n".to_string(),
            charts: (0..charts)
                .map(|index| ChartArtifact {
                    index,
                    png: vec![0x89, b'P', b'N', b'G', index as u8],
                })
                .collect(),
            ..Default::default()
        }))
    }

    pub fn failing_code(error: &str, traceback: &str) -> Self {
        Self::from_outcome(Ok(CodeRun {
            success: false,
            error: Some(error.to_string()),
            traceback: Some(traceback.to_string()),
            ..Default::default()
        }))
    }

    pub fn broken_backend() -> Self {
        Self::from_outcome(Err(Error::Agent("sandbox unreachable".to_string())))
    }

    fn from_outcome(outcome: Result<CodeRun>) -> Self {
        Self {
            outcome: Mutex::new(outcome),
            runs: AtomicUsize::new(0),
            codes: Mutex::new(Vec::new()),
        }
    }

    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CodeExecutor for FakeExecutor {
    async fn execute(&self, code: &str) -> Result<CodeRun> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        self.codes.lock().unwrap().push(code.to_string());
        match &*self.outcome.lock().unwrap() {
            Ok(run) => Ok(run.clone()),
            Err(e) => Err(Error::Agent(e.to_string())),
        }
    }
}

pub fn code_call(id: &str, code: &str) -> ToolCallRecord {
    ToolCallRecord::new(id, "run_python_code", json!({ "code": code }).to_string())
}

pub fn search_call(id: &str, query: &str) -> ToolCallRecord {
    ToolCallRecord::new(id, "brave_web_search", json!({ "query": query }).to_string())
}

/// Parse a tool-result message body
pub fn tool_content(message: &Message) -> Value {
    match message {
        Message::Tool { content, .. } => serde_json::from_str(content).unwrap(),
        other => panic!("expected tool message, got {:?}", other),
    }
}
