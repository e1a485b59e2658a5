//! OpenAI-compatible client configuration.

use crate::config::ModelSettings;
use crate::error::Result;
use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

/// Create a chat completions client for the configured endpoint.
///
/// Points at Ollama's OpenAI-compatible API unless configured otherwise.
pub fn create_client(settings: &ModelSettings) -> Result<Client<OpenAIConfig>> {
    create_client_with_timeout(
        settings,
        Duration::from_secs(settings.request_timeout_secs),
    )
}

/// Create a client with a custom timeout.
pub fn create_client_with_timeout(
    settings: &ModelSettings,
    timeout: Duration,
) -> Result<Client<OpenAIConfig>> {
    let http_client = reqwest::Client::builder().timeout(timeout).build()?;

    let config = OpenAIConfig::new()
        .with_api_base(&settings.api_base)
        .with_api_key(&settings.api_key);

    Ok(Client::with_config(config).with_http_client(http_client))
}
