//! Community discussion from r/CryptoCurrency.

use super::{truncate_chars, NewsItem, NewsSource};
use crate::utils::serialization::{de_opt_unix_seconds, unix_to_rfc3339};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use std::time::Duration;

const REDDIT_API: &str = "https://www.reddit.com";
const REDDIT_WEB: &str = "https://www.reddit.com";
const SUBREDDIT: &str = "CryptoCurrency";
const USER_AGENT: &str = concat!("surf-agent/", env!("CARGO_PKG_VERSION"));
const MAX_BODY_CHARS: usize = 500;
const EXCLUDED_FLAIRS: [&str; 2] = ["meme", "comedy"];

#[derive(Debug, Clone)]
pub struct RedditSource {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Child>,
}

#[derive(Debug, Deserialize)]
struct Child {
    data: Post,
}

#[derive(Debug, Deserialize)]
struct Post {
    #[serde(default)]
    title: String,
    #[serde(default)]
    selftext: String,
    #[serde(default)]
    permalink: String,
    #[serde(default, deserialize_with = "de_opt_unix_seconds")]
    created_utc: Option<i64>,
    #[serde(default)]
    link_flair_text: Option<String>,
    #[serde(default)]
    stickied: bool,
}

impl Post {
    fn is_excluded(&self) -> bool {
        if self.stickied {
            return true;
        }
        self.link_flair_text.as_deref().is_some_and(|flair| {
            flair
                .split(|c: char| !c.is_alphanumeric())
                .any(|word| EXCLUDED_FLAIRS.iter().any(|excluded| word.eq_ignore_ascii_case(excluded)))
        })
    }
}

impl RedditSource {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(20))
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build Reddit HTTP client")?;
        Ok(Self {
            client,
            base_url: REDDIT_API.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn hot_url(&self) -> Result<Url> {
        let mut url = Url::parse(&format!(
            "{}/r/{SUBREDDIT}/hot.json",
            self.base_url.trim_end_matches('/')
        ))
        .context("Invalid Reddit base URL")?;
        url.query_pairs_mut().append_pair("limit", "50");
        Ok(url)
    }
}

#[async_trait]
impl NewsSource for RedditSource {
    fn name(&self) -> &str {
        "reddit"
    }

    async fn fetch(&self) -> Result<Vec<NewsItem>> {
        let listing: Listing = self
            .client
            .get(self.hot_url()?)
            .header("accept", "application/json")
            .send()
            .await
            .context("Failed to send Reddit request")?
            .error_for_status()
            .context("Reddit API error")?
            .json()
            .await
            .context("Failed to parse Reddit listing")?;

        Ok(listing
            .data
            .children
            .into_iter()
            .map(|child| child.data)
            .filter(|post| !post.is_excluded())
            .map(|post| NewsItem {
                title: post.title,
                body: truncate_chars(&post.selftext, MAX_BODY_CHARS),
                url: format!("{REDDIT_WEB}{}", post.permalink),
                source: "reddit".to_string(),
                published_at: unix_to_rfc3339(post.created_utc),
                categories: post.link_flair_text.unwrap_or_default(),
            })
            .collect())
    }
}
