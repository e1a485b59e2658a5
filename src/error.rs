//! Error types for whatsnew.

use thiserror::Error;

/// Library-level error type for whatsnew operations.
#[derive(Error, Debug)]
pub enum WhatsNewError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to fetch the update feed: {0}")]
    FeedFetch(String),

    #[error("Failed to parse the update feed: {0}")]
    FeedParse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("Tool error: {0}")]
    Tool(String),

    #[error("MCP server '{server}': {message}")]
    Mcp { server: String, message: String },

    #[error("Agent error: {0}")]
    Agent(String),
}

impl WhatsNewError {
    /// Build an MCP error for the named server.
    pub fn mcp(server: impl Into<String>, message: impl Into<String>) -> Self {
        WhatsNewError::Mcp {
            server: server.into(),
            message: message.into(),
        }
    }
}

/// Result type alias for whatsnew operations.
pub type Result<T> = std::result::Result<T, WhatsNewError>;
