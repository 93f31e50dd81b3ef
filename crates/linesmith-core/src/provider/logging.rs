//! LLM request/response logging
//!
//! Set the `LLM_LOG_FILE` environment variable to append one JSON line per
//! model round (request transcript, declared tools, parsed response or
//! error).
//!
//! Example: `LLM_LOG_FILE=/tmp/llm.log linesmith analyze ...`

use std::io::Write;

use serde_json::json;
use tracing::{debug, warn};

use super::Completion;
use crate::conversation::Message;
use crate::tools::ToolDefinition;

/// Environment variable naming the log file
pub const LLM_LOG_FILE_ENV: &str = "LLM_LOG_FILE";

/// What to include in the log entry
#[derive(Default)]
pub struct LogConfig<'a> {
    pub model: &'a str,
    pub messages: &'a [Message],
    pub tools: &'a [ToolDefinition],
    pub result: Option<&'a Completion>,
    pub error: Option<&'a str>,
}

/// Append an interaction to the log file if `LLM_LOG_FILE` is set
pub fn log_llm_interaction(config: LogConfig<'_>) {
    let Ok(log_file) = std::env::var(LLM_LOG_FILE_ENV) else {
        return;
    };

    let entry = build_entry(&config);

    match std::fs::OpenOptions::new().create(true).append(true).open(&log_file) {
        Ok(mut file) => {
            if let Err(e) = writeln!(file, "{}", entry) {
                warn!("Failed to write to LLM log file: {}", e);
            }
        }
        Err(e) => {
            warn!("Failed to open LLM log file {}: {}", log_file, e);
        }
    }

    debug!("Logged LLM interaction to {}", log_file);
}

fn build_entry(config: &LogConfig<'_>) -> serde_json::Value {
    json!({
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "model": config.model,
        "request": {
            "messages": config.messages,
            "message_count": config.messages.len(),
            "tools": config.tools.iter().map(|tool| tool.name.as_str()).collect::<Vec<_>>(),
        },
        "response": config.result.map(|r| json!({
            "type": if r.has_tool_calls() { "tool_calls" } else { "message" },
            "content": r.content,
            "tool_calls": r.tool_calls,
        })),
        "error": config.error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::ToolCallRecord;

    #[test]
    fn test_entry_describes_tool_call_response() {
        let messages = vec![Message::user("hi")];
        let completion = Completion::tool_calls(vec![ToolCallRecord::new("c1", "run_python_code", "{}")]);

        let entry = build_entry(&LogConfig {
            model: "groq::test",
            messages: &messages,
            result: Some(&completion),
            ..Default::default()
        });

        assert_eq!(entry["model"], "groq::test");
        assert_eq!(entry["request"]["message_count"], 1);
        assert_eq!(entry["response"]["type"], "tool_calls");
        assert_eq!(entry["response"]["tool_calls"][0]["name"], "run_python_code");
        assert!(entry["error"].is_null());
    }
}
