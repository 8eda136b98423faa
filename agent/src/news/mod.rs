//! News aggregation.
//!
//! Every source is fetched concurrently, each behind its own retry loop and
//! failure boundary. A failing source contributes nothing; only a run where
//! every source fails (or all of them come back empty) is an error.

pub mod blockbeats;
pub mod cryptocompare;
pub mod reddit;

use crate::utils::retry::RetryPolicy;
use anyhow::{bail, Result};
use async_trait::async_trait;
use futures::future::join_all;
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{info, warn};

pub use blockbeats::BlockBeatsSource;
pub use cryptocompare::CryptoCompareSource;
pub use reddit::RedditSource;

const SOURCE_RETRY: RetryPolicy = RetryPolicy::fixed(3, Duration::from_secs(2));

/// One normalized article or post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewsItem {
    pub title: String,
    pub body: String,
    pub url: String,
    pub source: String,
    /// RFC 3339, UTC.
    pub published_at: String,
    pub categories: String,
}

/// A feed the aggregator can pull items from.
#[async_trait]
pub trait NewsSource: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch(&self) -> Result<Vec<NewsItem>>;
}

pub struct NewsAggregator {
    sources: Vec<Box<dyn NewsSource>>,
    retry: RetryPolicy,
}

impl NewsAggregator {
    pub fn new(sources: Vec<Box<dyn NewsSource>>) -> Self {
        Self {
            sources,
            retry: SOURCE_RETRY,
        }
    }

    /// The three public feeds at their production endpoints.
    pub fn with_default_sources(cryptocompare_api_key: Option<String>) -> Result<Self> {
        Ok(Self::new(vec![
            Box::new(CryptoCompareSource::new(cryptocompare_api_key)?),
            Box::new(BlockBeatsSource::new()?),
            Box::new(RedditSource::new()?),
        ]))
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Items from every source that answered, in source order.
    pub async fn collect(&self) -> Result<Vec<NewsItem>> {
        let fetches = self.sources.iter().map(|source| async move {
            let started = Instant::now();
            let result = self
                .retry
                .retry(source.name(), |_| true, || source.fetch())
                .await;
            (source.name(), result, started.elapsed())
        });

        let mut items = Vec::new();
        let mut failed = 0;
        for (name, result, elapsed) in join_all(fetches).await {
            match result {
                Ok(batch) => {
                    info!(source = name, count = batch.len(), ?elapsed, "news source fetched");
                    items.extend(batch);
                }
                Err(e) => {
                    failed += 1;
                    warn!(source = name, "news source failed: {e:#}");
                }
            }
        }

        if failed == self.sources.len() {
            bail!("All {failed} news sources failed");
        }
        if items.is_empty() {
            bail!("No news items available from any source");
        }

        Ok(items)
    }
}

/// First `max_chars` characters of `text`, never splitting a code point.
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
