//! Tool system for Linesmith agents
//!
//! The model sees two kinds of tools:
//! - provider tools (web search) served by an external [`ToolProvider`]
//! - the built-in code tool, run by a [`CodeExecutor`] under an
//!   [`ExecutionQuota`]
//!
//! Every call goes through the [`ToolDispatcher`], which never fails: each
//! problem is turned into a result the model can read and react to.

pub mod arguments;
pub mod catalog;
pub mod dispatcher;
pub mod executor;
pub mod provider;
pub mod quota;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

pub use arguments::{ArgumentStrategy, extract_code, parse_structured_arguments};
pub use catalog::{CODE_TOOL_NAME, ToolDefinition, build_catalog, code_tool_definition};
pub use dispatcher::{ToolDispatcher, ToolResult};
pub use executor::{CodeExecutor, CodeRun};
pub use provider::ToolProvider;
pub use quota::ExecutionQuota;

#[cfg(feature = "sandbox")]
pub use executor::SandboxExecutor;
#[cfg(feature = "mcp")]
pub use provider::McpToolProvider;

/// Result envelope for the code tool and for dispatch failures
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolOutput {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub charts_saved: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traceback: Option<String>,
}

impl ToolOutput {
    pub fn success() -> Self {
        Self {
            success: true,
            ..Default::default()
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn with_stdout(mut self, stdout: impl Into<String>) -> Self {
        self.stdout = Some(stdout.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_charts(mut self, files: Vec<String>) -> Self {
        self.chart_count = Some(files.len());
        self.charts_saved = Some(files);
        self
    }

    pub fn with_traceback(mut self, traceback: Option<String>) -> Self {
        self.traceback = traceback;
        self
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| json!({ "success": self.success }))
    }
}
