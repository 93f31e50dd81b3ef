//! Linesmith MCP - Model Context Protocol client
//!
//! This crate provides the client side of MCP for talking to external
//! tool providers (for example a web search server) running as a
//! subprocess over newline-delimited JSON-RPC on stdio.

pub mod client;
pub mod protocol;
pub mod transport;

use serde::{Deserialize, Serialize};

pub use client::{ClientInfo, ContentItem, McpClient, McpError, ServerInfo, ToolCallResult};
pub use transport::{StdioTransport, Transport};

/// MCP protocol version
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Tool definition in MCP format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpTool {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "inputSchema", default)]
    pub input_schema: serde_json::Value,
}

/// Server capabilities
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerCapabilities {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<ToolsCapability>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolsCapability {
    #[serde(rename = "listChanged", default)]
    pub list_changed: bool,
}
