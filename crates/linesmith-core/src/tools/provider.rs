//! External tool providers
//!
//! Bridges an MCP server's tools (web search) to the dispatcher. Results are
//! handed back as the server sent them.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::tools::ToolDefinition;

/// A source of tools the model can call by name
#[async_trait]
pub trait ToolProvider: Send + Sync {
    async fn list_tools(&self) -> Result<Vec<ToolDefinition>>;

    /// Call a tool; the returned value is forwarded to the model unmodified
    async fn call_tool(&self, name: &str, arguments: Value) -> Result<Value>;

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(feature = "mcp")]
pub use mcp::McpToolProvider;

#[cfg(feature = "mcp")]
mod mcp {
    use async_trait::async_trait;
    use linesmith_mcp::{ClientInfo, McpClient, StdioTransport};
    use serde_json::Value;
    use tracing::{debug, info};

    use super::ToolProvider;
    use crate::config::McpConfig;
    use crate::error::{Error, Result};
    use crate::tools::ToolDefinition;

    /// Tool provider backed by an MCP server subprocess
    pub struct McpToolProvider {
        client: McpClient<StdioTransport>,
        server_name: String,
    }

    impl McpToolProvider {
        /// Spawn the configured server and run the initialize handshake
        pub async fn connect(config: &McpConfig) -> Result<Self> {
            let transport = StdioTransport::spawn(&config.command, &config.args, &config.resolved_env())
                .await
                .map_err(|e| Error::Agent(format!("Failed to start MCP server '{}': {}", config.command, e)))?;

            let mut client = McpClient::new(transport);
            let server = client
                .initialize(ClientInfo {
                    name: config.client_name.clone(),
                    version: config.client_version.clone(),
                })
                .await
                .map_err(|e| Error::Agent(format!("MCP initialize failed: {}", e)))?;

            info!(server = %server.name, version = %server.version, "Connected to MCP server");
            Ok(Self {
                client,
                server_name: server.name,
            })
        }

        pub fn server_name(&self) -> &str {
            &self.server_name
        }
    }

    #[async_trait]
    impl ToolProvider for McpToolProvider {
        async fn list_tools(&self) -> Result<Vec<ToolDefinition>> {
            let tools = self
                .client
                .list_tools()
                .await
                .map_err(|e| Error::Agent(format!("MCP tools/list failed: {}", e)))?;

            Ok(tools
                .iter()
                .map(|tool| ToolDefinition::from_provider_schema(&tool.name, &tool.description, &tool.input_schema))
                .collect())
        }

        async fn call_tool(&self, name: &str, arguments: Value) -> Result<Value> {
            debug!(tool = name, %arguments, "Calling MCP tool");
            let result = self
                .client
                .call_tool(name, arguments)
                .await
                .map_err(|e| Error::Agent(format!("MCP tool '{}' failed: {}", name, e)))?;
            Ok(serde_json::to_value(result)?)
        }

        async fn close(&self) -> Result<()> {
            self.client
                .close()
                .await
                .map_err(|e| Error::Agent(format!("Failed to close MCP server: {}", e)))
        }
    }
}
