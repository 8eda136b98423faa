//! General English-language crypto news from CryptoCompare.

use super::{NewsItem, NewsSource};
use crate::utils::serialization::{de_category_label, de_opt_unix_seconds, unix_to_rfc3339};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use std::time::Duration;

const CRYPTOCOMPARE_API: &str = "https://min-api.cryptocompare.com";

#[derive(Debug, Clone)]
pub struct CryptoCompareSource {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NewsResponse {
    #[serde(rename = "Response", default)]
    response: Option<String>,
    #[serde(rename = "Message", default)]
    message: Option<String>,
    #[serde(rename = "Data", default)]
    data: Vec<Article>,
}

#[derive(Debug, Deserialize)]
struct Article {
    #[serde(default)]
    title: String,
    #[serde(default)]
    body: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    source: String,
    #[serde(default, deserialize_with = "de_opt_unix_seconds")]
    published_on: Option<i64>,
    #[serde(default, deserialize_with = "de_category_label")]
    categories: String,
}

impl CryptoCompareSource {
    pub fn new(api_key: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(20))
            .build()
            .context("Failed to build CryptoCompare HTTP client")?;
        Ok(Self {
            client,
            base_url: CRYPTOCOMPARE_API.to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn news_url(&self) -> Result<Url> {
        let mut url = Url::parse(&format!("{}/data/v2/news/", self.base_url.trim_end_matches('/')))
            .context("Invalid CryptoCompare base URL")?;
        url.query_pairs_mut().append_pair("lang", "EN");
        Ok(url)
    }
}

#[async_trait]
impl NewsSource for CryptoCompareSource {
    fn name(&self) -> &str {
        "cryptocompare"
    }

    async fn fetch(&self) -> Result<Vec<NewsItem>> {
        let mut request = self
            .client
            .get(self.news_url()?)
            .header("accept", "application/json");
        if let Some(key) = &self.api_key {
            request = request.header("authorization", format!("Apikey {key}"));
        }

        let resp: NewsResponse = request
            .send()
            .await
            .context("Failed to send CryptoCompare request")?
            .error_for_status()
            .context("CryptoCompare API error")?
            .json()
            .await
            .context("Failed to parse CryptoCompare response")?;

        if resp.response.as_deref() == Some("Error") {
            bail!(
                "CryptoCompare rejected the request: {}",
                resp.message.unwrap_or_default()
            );
        }

        Ok(resp
            .data
            .into_iter()
            .map(|a| NewsItem {
                title: a.title,
                body: a.body,
                url: a.url,
                source: a.source,
                published_at: unix_to_rfc3339(a.published_on),
                categories: a.categories,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[tokio::test]
    async fn maps_articles() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/data/v2/news/")
            .match_query(Matcher::UrlEncoded("lang".into(), "EN".into()))
            .match_header("authorization", "Apikey k-1")
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"Type":100,"Message":"News list successfully returned","Data":[
                    {"id":"1","title":"BTC breaks 100k","body":"Bitcoin rallied.","url":"https://cc.example/1",
                     "source":"coindesk","published_on":1700000000,"categories":"BTC|Market"}
                ]}"#,
            )
            .create_async()
            .await;

        let source = CryptoCompareSource::new(Some("k-1".into()))
            .unwrap()
            .with_base_url(server.url());
        let items = source.fetch().await.unwrap();
        mock.assert_async().await;

        assert_eq!(
            items,
            vec![NewsItem {
                title: "BTC breaks 100k".into(),
                body: "Bitcoin rallied.".into(),
                url: "https://cc.example/1".into(),
                source: "coindesk".into(),
                published_at: "2023-11-14T22:13:20.000Z".into(),
                categories: "BTC|Market".into(),
            }]
        );
    }

    #[tokio::test]
    async fn error_envelope_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/data/v2/news/")
            .match_query(Matcher::Any)
            .with_body(r#"{"Response":"Error","Message":"rate limit","Data":[]}"#)
            .create_async()
            .await;

        let source = CryptoCompareSource::new(None).unwrap().with_base_url(server.url());
        let err = source.fetch().await.unwrap_err();
        assert!(err.to_string().contains("rate limit"));
    }

    #[tokio::test]
    async fn http_failure_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/data/v2/news/")
            .match_query(Matcher::Any)
            .with_status(503)
            .create_async()
            .await;

        let source = CryptoCompareSource::new(None).unwrap().with_base_url(server.url());
        assert!(source.fetch().await.is_err());
    }
}
