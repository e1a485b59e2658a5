//! Configuration module for whatsnew.
//!
//! Handles loading and validating application settings.

mod settings;

pub use settings::{
    AgentSettings, FeedSettings, McpServerSettings, McpSettings, McpTransportKind, ModelSettings,
    ServerSettings, Settings, DEFAULT_FEED_URL,
};
