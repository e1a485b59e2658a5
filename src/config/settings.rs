//! Configuration settings for whatsnew.

use crate::error::{Result, WhatsNewError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Default AWS "What's New" RSS feed.
pub const DEFAULT_FEED_URL: &str = "https://aws.amazon.com/about-aws/whats-new/recent/feed/";

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub server: ServerSettings,
    pub model: ModelSettings,
    pub feed: FeedSettings,
    pub agent: AgentSettings,
    pub mcp: McpSettings,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Host to bind to.
    pub host: String,
    /// Port to bind to.
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

/// Chat model settings.
///
/// Any OpenAI-compatible chat completions endpoint works. The default points at
/// a local Ollama instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    /// Model name passed to the completions API.
    pub name: String,
    /// Base URL of the OpenAI-compatible API.
    pub api_base: String,
    /// API key. Ollama ignores it but the client always sends one.
    pub api_key: String,
    /// Request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            name: "llama3.1:8b".to_string(),
            api_base: "http://localhost:11434/v1".to_string(),
            api_key: "ollama".to_string(),
            request_timeout_secs: 300,
        }
    }
}

/// Update feed settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedSettings {
    /// RSS feed URL.
    pub url: String,
    /// Maximum number of updates returned per tool call, between 1 and
    /// [`MAX_UPDATES_COUNT`](crate::feed::MAX_UPDATES_COUNT).
    pub max_updates: usize,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_FEED_URL.to_string(),
            max_updates: crate::feed::MAX_UPDATES_COUNT,
        }
    }
}

/// Graph runner settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    /// Maximum number of model calls in one run.
    pub max_iterations: usize,
    /// Optional system prompt prepended to every conversation.
    pub system_prompt: Option<String>,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_iterations: 15,
            system_prompt: None,
        }
    }
}

/// MCP transport kind.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum McpTransportKind {
    /// Child process speaking newline-delimited JSON-RPC on stdin/stdout.
    #[default]
    Stdio,
    /// Streamable HTTP endpoint.
    Http,
}

/// One MCP server the client connects to.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct McpServerSettings {
    /// Server name, used in logs and to route tool calls.
    pub name: String,
    pub transport: McpTransportKind,
    /// Command to launch (stdio only).
    pub command: Option<String>,
    /// Command arguments (stdio only).
    pub args: Vec<String>,
    /// Working directory for the child process (stdio only).
    pub cwd: Option<String>,
    /// Extra environment variables for the child process (stdio only).
    pub env: HashMap<String, String>,
    /// Endpoint URL (http only).
    pub url: Option<String>,
}

/// MCP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct McpSettings {
    /// Connect to MCP servers at startup.
    pub enabled: bool,
    pub servers: Vec<McpServerSettings>,
}

impl Default for McpSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            servers: vec![
                McpServerSettings {
                    name: "file-system".to_string(),
                    transport: McpTransportKind::Stdio,
                    command: Some("npx".to_string()),
                    args: vec![
                        "-y".to_string(),
                        "@modelcontextprotocol/server-filesystem".to_string(),
                        "./".to_string(),
                    ],
                    ..Default::default()
                },
                McpServerSettings {
                    name: "aws-knowledge-mcp-server".to_string(),
                    transport: McpTransportKind::Http,
                    url: Some("https://knowledge-mcp.global.api.aws".to_string()),
                    ..Default::default()
                },
            ],
        }
    }
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        let settings = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Settings::default()
        };

        settings.validate()?;
        Ok(settings)
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| WhatsNewError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("whatsnew")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Check values that would otherwise fail deep inside a request.
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.feed.url)
            .map_err(|e| WhatsNewError::Config(format!("feed.url '{}': {}", self.feed.url, e)))?;
        url::Url::parse(&self.model.api_base).map_err(|e| {
            WhatsNewError::Config(format!("model.api_base '{}': {}", self.model.api_base, e))
        })?;

        let cap = crate::feed::MAX_UPDATES_COUNT;
        if !(1..=cap).contains(&self.feed.max_updates) {
            return Err(WhatsNewError::Config(format!(
                "feed.max_updates must be between 1 and {}, got {}",
                cap, self.feed.max_updates
            )));
        }

        if !self.mcp.enabled {
            return Ok(());
        }

        for server in &self.mcp.servers {
            match server.transport {
                McpTransportKind::Stdio => {
                    if server.command.as_deref().map_or(true, str::is_empty) {
                        return Err(WhatsNewError::Config(format!(
                            "MCP server '{}' uses stdio but has no command",
                            server.name
                        )));
                    }
                }
                McpTransportKind::Http => {
                    let raw = server.url.as_deref().unwrap_or_default();
                    url::Url::parse(raw).map_err(|e| {
                        WhatsNewError::Config(format!(
                            "MCP server '{}' url '{}': {}",
                            server.name, raw, e
                        ))
                    })?;
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_hardcoded_service() {
        let settings = Settings::default();
        assert_eq!(settings.server.port, 3000);
        assert_eq!(settings.model.name, "llama3.1:8b");
        assert_eq!(settings.feed.url, DEFAULT_FEED_URL);
        assert_eq!(settings.feed.max_updates, 3);
        assert!(settings.agent.system_prompt.is_none());

        let names: Vec<_> = settings.mcp.servers.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["file-system", "aws-knowledge-mcp-server"]);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [server]
            port = 8080

            [mcp]
            enabled = false
            "#,
        )
        .unwrap();

        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.server.host, "127.0.0.1");
        assert!(!settings.mcp.enabled);
        assert_eq!(settings.mcp.servers.len(), 2);
        assert_eq!(settings.model.name, "llama3.1:8b");
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut settings = Settings::default();
        settings.model.name = "qwen2.5:7b".to_string();
        settings.agent.system_prompt = Some("Answer in English.".to_string());
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(loaded.model.name, "qwen2.5:7b");
        assert_eq!(loaded.agent.system_prompt.as_deref(), Some("Answer in English."));
        assert_eq!(loaded.mcp.servers[1].transport, McpTransportKind::Http);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let loaded = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(loaded.server.port, 3000);
    }

    #[test]
    fn test_validate_rejects_stdio_without_command() {
        let mut settings = Settings::default();
        settings.mcp.servers[0].command = None;
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("file-system"));
    }

    #[test]
    fn test_validate_rejects_bad_feed_url() {
        let mut settings = Settings::default();
        settings.feed.url = "not a url".to_string();
        assert!(matches!(settings.validate(), Err(WhatsNewError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_max_updates_above_cap() {
        let settings: Settings = toml::from_str("[feed]\nmax_updates = 10").unwrap();
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("feed.max_updates"));

        let settings: Settings = toml::from_str("[feed]\nmax_updates = 0").unwrap();
        assert!(settings.validate().is_err());

        let settings: Settings = toml::from_str("[feed]\nmax_updates = 2").unwrap();
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_validate_skips_disabled_mcp() {
        let settings: Settings = toml::from_str(
            r#"
            [mcp]
            enabled = false

            [[mcp.servers]]
            name = "half-edited"
            transport = "stdio"
            "#,
        )
        .unwrap();
        assert!(settings.validate().is_ok());

        let mut enabled = settings.clone();
        enabled.mcp.enabled = true;
        assert!(enabled.validate().is_err());
    }
}
