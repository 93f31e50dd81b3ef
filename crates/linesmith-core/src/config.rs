//! Configuration management for Linesmith
//!
//! Handles loading and saving the TOML configuration: model provider
//! settings, agent limits, the MCP search server command, and the code
//! sandbox.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Error, Result};

/// Environment variable that overrides `agent.max_retries`
pub const MAX_RETRIES_ENV: &str = "MAX_RETRIES";

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub mcp: McpConfig,
    #[serde(default)]
    pub sandbox: SandboxSettings,
}

impl Config {
    /// Apply environment overrides on top of file values
    pub fn apply_env_overrides(&mut self) {
        if let Ok(raw) = std::env::var(MAX_RETRIES_ENV) {
            match raw.trim().parse::<usize>() {
                Ok(n) => self.agent.max_retries = n,
                Err(_) => warn!("Ignoring invalid {}={:?}", MAX_RETRIES_ENV, raw),
            }
        }
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Provider type: "groq", "openai", "anthropic", ...
    pub provider_type: String,
    /// Model to use
    pub model: String,
    /// API key (can be loaded from env)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Environment variable name for API key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider_type: "groq".to_string(),
            model: "openai/gpt-oss-20b".to_string(),
            api_key: None,
            api_key_env: Some("GROQ_API_KEY".to_string()),
        }
    }
}

impl ProviderConfig {
    /// Get the API key, checking the environment variable if not set directly
    pub fn get_api_key(&self) -> Option<String> {
        if let Some(key) = &self.api_key
            && !key.is_empty()
        {
            return Some(key.clone());
        }

        self.api_key_env
            .as_deref()
            .and_then(|name| std::env::var(name).ok())
            .filter(|key| !key.is_empty())
    }

    /// Model identifier namespaced by provider, e.g. `groq::openai/gpt-oss-20b`
    pub fn model_id(&self) -> String {
        if self.model.contains("::") {
            self.model.clone()
        } else {
            format!("{}::{}", self.provider_type, self.model)
        }
    }
}

/// Agent loop limits and output locations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Extra attempts after the first one
    pub max_retries: usize,
    /// Code executions allowed per attempt
    pub max_code_executions: usize,
    /// Model rounds allowed per attempt
    pub max_rounds: usize,
    /// Chart file prefix
    pub chart_prefix: String,
    /// Directory holding one subdirectory per job
    pub results_dir: PathBuf,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            max_code_executions: 1,
            max_rounds: 25,
            chart_prefix: "nfl-analysis".to_string(),
            results_dir: PathBuf::from("analysis_results"),
        }
    }
}

/// MCP tool server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct McpConfig {
    pub command: String,
    pub args: Vec<String>,
    /// Extra environment for the server; values written as `$NAME` are
    /// read from the current environment
    pub env: BTreeMap<String, String>,
    /// Name of the search tool the prompts refer to
    pub search_tool: String,
    pub client_name: String,
    pub client_version: String,
}

impl Default for McpConfig {
    fn default() -> Self {
        let mut env = BTreeMap::new();
        env.insert("BRAVE_API_KEY".to_string(), "$BRAVE_API_KEY".to_string());

        Self {
            command: "docker".to_string(),
            args: ["run", "-i", "--rm", "-e", "BRAVE_API_KEY", "mcp/brave-search"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            env,
            search_tool: "brave_web_search".to_string(),
            client_name: "brave-search-client".to_string(),
            client_version: "1.0.0".to_string(),
        }
    }
}

impl McpConfig {
    /// Environment pairs with `$NAME` references resolved
    pub fn resolved_env(&self) -> Vec<(String, String)> {
        self.env
            .iter()
            .map(|(key, value)| {
                let resolved = match value.strip_prefix('$') {
                    Some(name) => std::env::var(name).unwrap_or_else(|_| {
                        warn!("Environment variable {} is not set", name);
                        String::new()
                    }),
                    None => value.clone(),
                };
                (key.clone(), resolved)
            })
            .collect()
    }
}

/// Code sandbox settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxSettings {
    pub interpreter: String,
    pub timeout_secs: u64,
    /// Session root; defaults to the system temp directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,
}

impl Default for SandboxSettings {
    fn default() -> Self {
        Self {
            interpreter: "python3".to_string(),
            timeout_secs: 15 * 60,
            root: None,
        }
    }
}

#[cfg(feature = "sandbox")]
impl SandboxSettings {
    pub fn to_sandbox_config(&self) -> linesmith_sandbox::SandboxConfig {
        let mut config = linesmith_sandbox::SandboxConfig::python()
            .with_interpreter(&self.interpreter)
            .with_timeout_secs(self.timeout_secs);
        if let Some(root) = &self.root {
            config = config.with_root(root);
        }
        config
    }
}

/// Configuration manager for loading and saving config
pub struct ConfigManager {
    config_path: PathBuf,
    config: Config,
}

impl ConfigManager {
    /// Create a new config manager with default path
    pub fn new() -> Result<Self> {
        let config_path = Self::default_config_path()?;
        Self::with_path(config_path)
    }

    /// Create a config manager with a specific path
    pub fn with_path(config_path: PathBuf) -> Result<Self> {
        let mut config = if config_path.exists() {
            Self::load_from_path(&config_path)?
        } else {
            Config::default()
        };
        config.apply_env_overrides();

        Ok(Self { config_path, config })
    }

    /// Get the default config path
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| Error::Config("Could not find config directory".to_string()))?;

        Ok(config_dir.join("linesmith").join("config.toml"))
    }

    fn load_from_path(path: &Path) -> Result<Config> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config: {}", e)))?;

        toml::from_str(&content).map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Save the current configuration to disk
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Config(format!("Failed to create config dir: {}", e)))?;
        }

        let content = toml::to_string_pretty(&self.config)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(&self.config_path, content)
            .map_err(|e| Error::Config(format!("Failed to write config: {}", e)))?;

        Ok(())
    }
}
