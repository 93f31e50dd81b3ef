//! Tool definitions declared to the model

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::warn;

/// Name of the built-in code execution tool
pub const CODE_TOOL_NAME: &str = "run_python_code";

/// Tool definition for LLM consumption
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl ToolDefinition {
    /// Wrap a provider tool, reducing its input schema to an object schema
    /// carrying only `properties` and `required`
    pub fn from_provider_schema(name: impl Into<String>, description: impl Into<String>, schema: &Value) -> Self {
        let mut parameters = Map::new();
        parameters.insert("type".to_string(), Value::String("object".to_string()));
        parameters.insert(
            "properties".to_string(),
            schema
                .get("properties")
                .cloned()
                .unwrap_or_else(|| Value::Object(Map::new())),
        );
        if let Some(required) = schema.get("required") {
            parameters.insert("required".to_string(), required.clone());
        }

        Self {
            name: name.into(),
            description: description.into(),
            parameters: Value::Object(parameters),
        }
    }
}

/// Definition of the code execution tool
pub fn code_tool_definition() -> ToolDefinition {
    ToolDefinition {
        name: CODE_TOOL_NAME.to_string(),
        description: "Execute Python code in a sandboxed environment. Use this to create visualizations and analyze data."
            .to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "code": {
                    "type": "string",
                    "description": "Python code to execute. MUST include matplotlib.pyplot.savefig() to save charts as PNG files."
                }
            },
            "required": ["code"]
        }),
    }
}

/// Provider tools followed by the code tool
pub fn build_catalog(provider_tools: Vec<ToolDefinition>) -> Vec<ToolDefinition> {
    let mut catalog: Vec<ToolDefinition> = provider_tools
        .into_iter()
        .filter(|tool| {
            if tool.name == CODE_TOOL_NAME {
                warn!("Provider tool {} shadows the built-in code tool; ignoring it", tool.name);
                return false;
            }
            true
        })
        .collect();
    catalog.push(code_tool_definition());
    catalog
}
