//! Updates command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::feed::RssFeedFetcher;
use crate::tools::AwsUpdatesTool;
use anyhow::Result;
use std::sync::Arc;

/// Print the tool output for a service, bypassing the model.
pub async fn run_updates(service: &str, settings: Settings) -> Result<()> {
    let fetcher = RssFeedFetcher::new(&settings.feed.url);
    let spinner = Output::spinner(&format!("Fetching {}...", fetcher.url()));
    let tool = AwsUpdatesTool::new(Arc::new(fetcher), settings.feed.max_updates);

    let result = tool.run(service).await;
    spinner.finish_and_clear();

    match result {
        Ok(json) => {
            println!("{}", json);
            Ok(())
        }
        Err(e) => {
            Output::error(&format!("Failed to fetch updates: {}", e));
            Err(e.into())
        }
    }
}
