//! AWS update feed: fetching, parsing and filtering.
//!
//! The feed is fetched fresh on every lookup. Matching items are projected
//! into [`UpdateRecord`]s, capped at a small maximum.

mod rss;

pub use rss::{parse_feed, RssFeedFetcher};

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Maximum number of updates returned for a single lookup.
pub const MAX_UPDATES_COUNT: usize = 3;

/// One entry of the RSS feed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedItem {
    pub title: Option<String>,
    /// Raw `pubDate` text.
    pub pub_date: Option<String>,
    /// Plain-text rendering of `content`.
    pub content_snippet: Option<String>,
    /// Raw `description` body (may contain HTML).
    pub content: Option<String>,
}

/// Caller-facing projection of a matching [`FeedItem`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

/// Source of feed items.
#[async_trait]
pub trait FeedFetcher: Send + Sync {
    /// Fetch and parse the whole feed.
    async fn fetch(&self) -> Result<Vec<FeedItem>>;
}

/// Select the updates whose title mentions `service_name`.
///
/// Matching is a case-insensitive substring test. Items without a title (or
/// with an empty one) are skipped, and scanning stops as soon as `limit`
/// records have been collected. `limit` never exceeds [`MAX_UPDATES_COUNT`].
pub fn filter_updates(items: &[FeedItem], service_name: &str, limit: usize) -> Vec<UpdateRecord> {
    let limit = limit.min(MAX_UPDATES_COUNT);
    let mut results = Vec::new();
    let needle = service_name.to_lowercase();

    for item in items {
        if results.len() >= limit {
            break;
        }

        let Some(title) = item.title.as_deref().filter(|t| !t.is_empty()) else {
            continue;
        };

        if title.to_lowercase().contains(&needle) {
            results.push(UpdateRecord {
                published: item.pub_date.clone(),
                summary: first_non_empty(&item.content_snippet, &item.content),
            });
        }
    }

    results
}

fn first_non_empty(primary: &Option<String>, fallback: &Option<String>) -> Option<String> {
    primary
        .as_ref()
        .filter(|s| !s.is_empty())
        .or_else(|| fallback.as_ref().filter(|s| !s.is_empty()))
        .cloned()
}
