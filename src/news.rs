//! Headline sources - RSS feeds over HTTP plus a static fallback

use std::collections::HashSet;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::{AllocatorError, Result};
use crate::types::Headline;

/// Trait for headline sources
#[async_trait::async_trait]
pub trait HeadlineSource: Send + Sync {
    /// Fetch up to `limit` headlines. An empty batch is a valid result.
    async fn fetch(&self, limit: usize) -> Result<Vec<Headline>>;

    /// Source name
    fn name(&self) -> &str;
}

/// Collapse runs of whitespace and trim
pub fn clean_text(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Pulls headlines from a list of RSS feeds. A failing feed is skipped.
pub struct RssHeadlineSource {
    feeds: Vec<String>,
    client: reqwest::Client,
}

impl RssHeadlineSource {
    pub fn new(feeds: Vec<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent("news-allocator/0.1")
            .build()?;
        Ok(Self { feeds, client })
    }

    /// Entries taken from each feed before de-duplication
    fn per_feed_limit(&self, limit: usize) -> usize {
        (limit / self.feeds.len().max(1)).max(5)
    }

    async fn fetch_feed(&self, url: &str) -> Result<rss::Channel> {
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(AllocatorError::Feed {
                url: url.to_string(),
                message: format!("HTTP {}", response.status()),
            });
        }

        let content = response.bytes().await?;
        rss::Channel::read_from(&content[..]).map_err(|e| AllocatorError::Feed {
            url: url.to_string(),
            message: e.to_string(),
        })
    }
}

#[async_trait::async_trait]
impl HeadlineSource for RssHeadlineSource {
    async fn fetch(&self, limit: usize) -> Result<Vec<Headline>> {
        let per_feed = self.per_feed_limit(limit);
        let mut seen = HashSet::new();
        let mut headlines = Vec::new();

        for url in &self.feeds {
            let channel = match self.fetch_feed(url).await {
                Ok(channel) => channel,
                Err(e) => {
                    warn!("Skipping feed: {}", e);
                    continue;
                }
            };

            let source = match clean_text(channel.title()) {
                t if t.is_empty() => url.clone(),
                t => t,
            };

            let mut taken = 0;
            for item in channel.items().iter().take(per_feed) {
                let title = clean_text(item.title().unwrap_or(""));
                if title.is_empty() || !seen.insert(title.to_lowercase()) {
                    continue;
                }
                headlines.push(Headline {
                    title,
                    source: source.clone(),
                    published: clean_text(item.pub_date().unwrap_or("")),
                });
                taken += 1;
            }
            debug!("Feed {} yielded {} headlines", url, taken);
        }

        headlines.truncate(limit);
        info!(
            "Fetched {} headlines from {} feeds",
            headlines.len(),
            self.feeds.len()
        );
        Ok(headlines)
    }

    fn name(&self) -> &str {
        "rss"
    }
}

/// Fixed headline list, for offline runs and tests
#[derive(Debug, Clone, Default)]
pub struct StaticHeadlineSource {
    headlines: Vec<Headline>,
}

impl StaticHeadlineSource {
    pub fn new(headlines: Vec<Headline>) -> Self {
        Self { headlines }
    }

    /// Built-in headlines used when live feeds return nothing
    pub fn fallback() -> Self {
        Self::new(vec![
            Headline::new("Markets mixed as investors await inflation data", "Fallback"),
            Headline::new("Tech stocks rise after strong earnings guidance", "Fallback"),
            Headline::new("Oil climbs on geopolitical tensions", "Fallback"),
        ])
    }
}

#[async_trait::async_trait]
impl HeadlineSource for StaticHeadlineSource {
    async fn fetch(&self, limit: usize) -> Result<Vec<Headline>> {
        Ok(self.headlines.iter().take(limit).cloned().collect())
    }

    fn name(&self) -> &str {
        "static"
    }
}
