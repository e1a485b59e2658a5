//! RSS fetching and parsing.

use super::{FeedFetcher, FeedItem};
use crate::error::{Result, WhatsNewError};
use async_trait::async_trait;
use quick_xml::de::from_str;
use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;
use tracing::{debug, error, instrument};

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
}

static BLOCK_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)</?(h[1-6]?|br|p|ul|ol|li|blockquote|section|table|tr|div)\b[^>]*>")
        .expect("valid block tag regex")
});

static ANY_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid tag regex"));

/// Fetches the feed over HTTP on every call.
pub struct RssFeedFetcher {
    url: String,
    client: reqwest::Client,
}

impl RssFeedFetcher {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::new(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn fetch_body(&self) -> std::result::Result<String, reqwest::Error> {
        self.client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await
    }
}

#[async_trait]
impl FeedFetcher for RssFeedFetcher {
    #[instrument(skip(self), fields(url = %self.url))]
    async fn fetch(&self) -> Result<Vec<FeedItem>> {
        let body = self.fetch_body().await.map_err(|e| {
            error!(error = %e, "failed to fetch the RSS feed");
            WhatsNewError::FeedFetch(e.to_string())
        })?;

        parse_feed(&body).map_err(|e| {
            error!(error = %e, "failed to parse the RSS feed");
            WhatsNewError::FeedFetch(e.to_string())
        })
    }
}

/// Parse an RSS 2.0 document into feed items, preserving feed order.
pub fn parse_feed(xml: &str) -> Result<Vec<FeedItem>> {
    let xml_clean = scrub_html_entities_for_xml(xml);
    let rss: Rss = from_str(&xml_clean).map_err(|e| WhatsNewError::FeedParse(e.to_string()))?;

    let items: Vec<FeedItem> = rss
        .channel
        .item
        .into_iter()
        .map(|it| FeedItem {
            title: it.title,
            pub_date: it.pub_date,
            content_snippet: it.description.as_deref().map(snippet),
            content: it.description,
        })
        .collect();

    debug!("Parsed {} feed items", items.len());
    Ok(items)
}

/// Plain-text rendering of an HTML fragment.
fn snippet(html: &str) -> String {
    let text = BLOCK_TAG.replace_all(html, "\n");
    let text = ANY_TAG.replace_all(&text, "");
    html_escape::decode_html_entities(&text).trim().to_string()
}

/// Replace HTML-only entities that are not valid in XML.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", "&#160;")
        .replace("&ndash;", "&#8211;")
        .replace("&mdash;", "&#8212;")
        .replace("&ldquo;", "&#8220;")
        .replace("&rdquo;", "&#8221;")
        .replace("&lsquo;", "&#8216;")
        .replace("&rsquo;", "&#8217;")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:atom="http://www.w3.org/2005/Atom">
  <channel>
    <title>Recent Announcements</title>
    <link>https://aws.amazon.com/about-aws/whats-new/recent/</link>
    <item>
      <guid isPermaLink="false">a1</guid>
      <title>Amazon S3 adds conditional writes</title>
      <description><![CDATA[<p>Amazon S3 now supports <b>conditional</b> writes.</p><p>Available today.</p>]]></description>
      <pubDate>Tue, 20 Aug 2024 17:00:00 GMT</pubDate>
      <category>general:products/amazon-s3</category>
      <category>marketing:marchitecture/storage</category>
      <link>https://aws.amazon.com/about-aws/whats-new/2024/08/s3-conditional-writes/</link>
    </item>
    <item>
      <title>AWS Lambda &amp; SnapStart</title>
      <pubDate>Wed, 21 Aug 2024 09:00:00 GMT</pubDate>
    </item>
    <item>
      <description>No title here</description>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn test_parse_feed_items() {
        let items = parse_feed(SAMPLE_FEED).unwrap();
        assert_eq!(items.len(), 3);

        let s3 = &items[0];
        assert_eq!(s3.title.as_deref(), Some("Amazon S3 adds conditional writes"));
        assert_eq!(s3.pub_date.as_deref(), Some("Tue, 20 Aug 2024 17:00:00 GMT"));
        assert!(s3.content.as_deref().unwrap().starts_with("<p>Amazon S3"));
        assert_eq!(
            s3.content_snippet.as_deref(),
            Some("Amazon S3 now supports conditional writes.\n\nAvailable today.")
        );

        assert_eq!(items[1].title.as_deref(), Some("AWS Lambda & SnapStart"));
        assert!(items[1].content.is_none());
        assert!(items[1].content_snippet.is_none());

        assert!(items[2].title.is_none());
    }

    #[test]
    fn test_parse_empty_channel() {
        let xml = r#"<rss version="2.0"><channel><title>x</title></channel></rss>"#;
        assert!(parse_feed(xml).unwrap().is_empty());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            parse_feed("this is not xml"),
            Err(WhatsNewError::FeedParse(_))
        ));
    }

    #[test]
    fn test_snippet_decodes_entities() {
        assert_eq!(snippet("  <div>Graviton&#8217;s &lt;new&gt; chips</div> "), "Graviton’s <new> chips");
    }

    #[tokio::test]
    async fn test_unreachable_feed_is_fetch_error() {
        let fetcher = RssFeedFetcher::new("http://127.0.0.1:9/feed");
        let err = fetcher.fetch().await.unwrap_err();
        assert!(matches!(err, WhatsNewError::FeedFetch(_)));
    }
}
