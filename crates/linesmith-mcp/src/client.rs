//! MCP Client implementation

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::debug;

use crate::protocol::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, RequestId, methods};
use crate::transport::Transport;
use crate::{McpTool, PROTOCOL_VERSION, ServerCapabilities};

/// MCP Client for connecting to MCP servers
///
/// Requests are serialized on the transport: one request is written and its
/// response read before the next request may start.
pub struct McpClient<T: Transport> {
    transport: Arc<Mutex<T>>,
    request_id: AtomicI64,
    server_capabilities: Option<ServerCapabilities>,
}

impl<T: Transport> McpClient<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport: Arc::new(Mutex::new(transport)),
            request_id: AtomicI64::new(1),
            server_capabilities: None,
        }
    }

    fn next_id(&self) -> RequestId {
        RequestId::Number(self.request_id.fetch_add(1, Ordering::SeqCst))
    }

    pub fn server_capabilities(&self) -> Option<&ServerCapabilities> {
        self.server_capabilities.as_ref()
    }

    /// Initialize the connection
    pub async fn initialize(&mut self, client_info: ClientInfo) -> Result<ServerInfo, McpError> {
        let params = serde_json::json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": {
                "name": client_info.name,
                "version": client_info.version
            }
        });

        let request = JsonRpcRequest::new(self.next_id(), methods::INITIALIZE).with_params(params);
        let result = self.request(request).await?;

        let init: InitializeResult =
            serde_json::from_value(result).map_err(|e| McpError::Protocol(e.to_string()))?;
        self.server_capabilities = Some(init.capabilities);

        let notification = serde_json::to_value(JsonRpcNotification::new(methods::INITIALIZED))
            .map_err(|e| McpError::Protocol(e.to_string()))?;
        self.transport
            .lock()
            .await
            .send(notification)
            .await
            .map_err(|e| McpError::Transport(e.to_string()))?;

        Ok(ServerInfo {
            name: init.server_info.name,
            version: init.server_info.version,
        })
    }

    /// List available tools
    pub async fn list_tools(&self) -> Result<Vec<McpTool>, McpError> {
        let request = JsonRpcRequest::new(self.next_id(), methods::TOOLS_LIST);
        let result = self.request(request).await?;

        let tools: ToolsListResult =
            serde_json::from_value(result).map_err(|e| McpError::Protocol(e.to_string()))?;
        Ok(tools.tools)
    }

    /// Call a tool
    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<ToolCallResult, McpError> {
        let params = serde_json::json!({
            "name": name,
            "arguments": arguments
        });

        let request = JsonRpcRequest::new(self.next_id(), methods::TOOLS_CALL).with_params(params);
        let result = self.request(request).await?;

        serde_json::from_value(result).map_err(|e| McpError::Protocol(e.to_string()))
    }

    /// Shut down the transport
    pub async fn close(&self) -> Result<(), McpError> {
        self.transport
            .lock()
            .await
            .close()
            .await
            .map_err(|e| McpError::Transport(e.to_string()))
    }

    /// Send a request and return its `result` payload
    async fn request(&self, request: JsonRpcRequest) -> Result<Value, McpError> {
        let response = self.send_request(request).await?;

        if let Some(error) = response.error {
            Err(McpError::Server(error.message))
        } else if let Some(result) = response.result {
            Ok(result)
        } else {
            Err(McpError::Protocol("Empty response".to_string()))
        }
    }

    async fn send_request(&self, request: JsonRpcRequest) -> Result<JsonRpcResponse, McpError> {
        let mut transport = self.transport.lock().await;

        let request_id = request.id.clone();
        let request_value =
            serde_json::to_value(&request).map_err(|e| McpError::Protocol(e.to_string()))?;

        transport
            .send(request_value)
            .await
            .map_err(|e| McpError::Transport(e.to_string()))?;

        loop {
            let response_value = transport
                .receive()
                .await
                .map_err(|e| McpError::Transport(e.to_string()))?
                .ok_or_else(|| McpError::Transport("Connection closed".to_string()))?;

            let response: JsonRpcResponse = serde_json::from_value(response_value)
                .map_err(|e| McpError::Protocol(e.to_string()))?;

            match &response.id {
                Some(id) if *id == request_id => return Ok(response),
                other => {
                    debug!(?other, expected = ?request_id, "Skipping unrelated MCP message");
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientInfo {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Deserialize)]
struct InitializeResult {
    #[serde(default)]
    capabilities: ServerCapabilities,
    #[serde(rename = "serverInfo")]
    server_info: ServerInfoInner,
}

#[derive(Debug, Deserialize)]
struct ServerInfoInner {
    name: String,
    #[serde(default)]
    version: String,
}

#[derive(Debug, Deserialize)]
struct ToolsListResult {
    #[serde(default)]
    tools: Vec<McpTool>,
}

/// Result of `tools/call`, kept close to the wire shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallResult {
    #[serde(default)]
    pub content: Vec<ContentItem>,
    #[serde(rename = "isError", default)]
    pub is_error: bool,
}

impl ToolCallResult {
    /// Concatenated text of all text content items
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|item| item.text.as_deref())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    #[serde(rename = "type")]
    pub content_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Fields of non-text content (images, resources) pass through untouched
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// MCP errors
#[derive(Debug, thiserror::Error)]
pub enum McpError {
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Protocol error: {0}")]
    Protocol(String),
    #[error("Server error: {0}")]
    Server(String),
}
