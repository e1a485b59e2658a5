//! The `getAwsUpdates` tool.

use super::ToolSpec;
use crate::error::{Result, WhatsNewError};
use crate::feed::{filter_updates, FeedFetcher, MAX_UPDATES_COUNT};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};

/// Tool name exposed to the model.
pub const GET_AWS_UPDATES: &str = "getAwsUpdates";

/// Arguments accepted by `getAwsUpdates`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetAwsUpdatesArgs {
    /// AWS service name to search updates for.
    pub service_name: String,
}

impl GetAwsUpdatesArgs {
    /// Parse the raw JSON arguments sent by the model.
    pub fn parse(arguments: &str) -> Result<Self> {
        let raw = if arguments.trim().is_empty() {
            "{}"
        } else {
            arguments
        };
        serde_json::from_str(raw).map_err(|e| {
            WhatsNewError::Tool(format!("Invalid arguments for {}: {}", GET_AWS_UPDATES, e))
        })
    }
}

/// Looks up the latest updates for an AWS service in the RSS feed.
#[derive(Clone)]
pub struct AwsUpdatesTool {
    fetcher: Arc<dyn FeedFetcher>,
    max_updates: usize,
}

impl AwsUpdatesTool {
    /// `max_updates` is clamped to [`MAX_UPDATES_COUNT`].
    pub fn new(fetcher: Arc<dyn FeedFetcher>, max_updates: usize) -> Self {
        Self {
            fetcher,
            max_updates: max_updates.min(MAX_UPDATES_COUNT),
        }
    }

    pub fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: GET_AWS_UPDATES.to_string(),
            description: format!(
                "Fetch up to {} of the latest updates for the given AWS service from the AWS What's New RSS feed.",
                self.max_updates
            ),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "serviceName": {
                        "type": "string",
                        "description": "Name of the AWS service to search updates for"
                    }
                },
                "required": ["serviceName"]
            }),
        }
    }

    /// Fetch the feed, filter it, and render the matches as pretty JSON.
    ///
    /// A failed fetch is returned as [`WhatsNewError::FeedFetch`] and never
    /// produces a partial result.
    #[instrument(skip(self))]
    pub async fn run(&self, service_name: &str) -> Result<String> {
        let items = self.fetcher.fetch().await?;
        let updates = filter_updates(&items, service_name, self.max_updates);
        info!(
            "Found {} update(s) for '{}' in {} feed items",
            updates.len(),
            service_name,
            items.len()
        );
        Ok(serde_json::to_string_pretty(&updates)?)
    }
}
