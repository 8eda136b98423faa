//! Chinese-language flash news from the BlockBeats open API.

use super::{NewsItem, NewsSource};
use crate::utils::serialization::{de_opt_unix_seconds, unix_to_rfc3339};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use regex::Regex;
use reqwest::{Client, Url};
use serde::Deserialize;
use std::sync::LazyLock;
use std::time::Duration;

const BLOCKBEATS_API: &str = "https://api.theblockbeats.news";
const PAGE_SIZE: &str = "50";
const CATEGORY: &str = "flash";

static HTML_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));

#[derive(Debug, Clone)]
pub struct BlockBeatsSource {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct FlashResponse {
    #[serde(default)]
    status: Option<i64>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<FlashPage>,
}

#[derive(Debug, Deserialize)]
struct FlashPage {
    #[serde(default)]
    data: Vec<Flash>,
}

#[derive(Debug, Deserialize)]
struct Flash {
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    link: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default, deserialize_with = "de_opt_unix_seconds")]
    create_time: Option<i64>,
}

impl BlockBeatsSource {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(20))
            .build()
            .context("Failed to build BlockBeats HTTP client")?;
        Ok(Self {
            client,
            base_url: BLOCKBEATS_API.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn flash_url(&self) -> Result<Url> {
        let mut url = Url::parse(&format!(
            "{}/v1/open-api/open-flash",
            self.base_url.trim_end_matches('/')
        ))
        .context("Invalid BlockBeats base URL")?;
        url.query_pairs_mut()
            .append_pair("size", PAGE_SIZE)
            .append_pair("page", "1")
            .append_pair("type", "push")
            .append_pair("lang", "cn");
        Ok(url)
    }
}

#[async_trait]
impl NewsSource for BlockBeatsSource {
    fn name(&self) -> &str {
        "blockbeats"
    }

    async fn fetch(&self) -> Result<Vec<NewsItem>> {
        let resp: FlashResponse = self
            .client
            .get(self.flash_url()?)
            .header("accept", "application/json")
            .send()
            .await
            .context("Failed to send BlockBeats request")?
            .error_for_status()
            .context("BlockBeats API error")?
            .json()
            .await
            .context("Failed to parse BlockBeats response")?;

        if let Some(status) = resp.status.filter(|s| *s != 0) {
            bail!(
                "BlockBeats returned status {status}: {}",
                resp.message.unwrap_or_default()
            );
        }

        Ok(resp
            .data
            .map(|page| page.data)
            .unwrap_or_default()
            .into_iter()
            .map(|f| NewsItem {
                title: f.title.trim().to_string(),
                body: strip_html(&f.content),
                url: f
                    .link
                    .filter(|l| !l.is_empty())
                    .or(f.url)
                    .unwrap_or_default(),
                source: "BlockBeats".to_string(),
                published_at: unix_to_rfc3339(f.create_time),
                categories: CATEGORY.to_string(),
            })
            .collect())
    }
}

/// Drop markup and decode the handful of entities the feed uses.
fn strip_html(html: &str) -> String {
    HTML_TAG
        .replace_all(html, "")
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
        .trim()
        .to_string()
}
