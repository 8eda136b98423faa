//! Question synthesis over an OpenAI-compatible chat completion endpoint.

mod output;
mod prompt;

use crate::news::NewsItem;
use crate::utils::retry::{is_transient, RetryPolicy};
use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveDate;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

pub const DEFAULT_LLM_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_LLM_MODEL: &str = "gpt-4o-mini";

const COMPLETION_RETRY: RetryPolicy = RetryPolicy::linear(3, Duration::from_millis(3000));
const PLACEHOLDER_KEYS: [&str; 4] = ["your_api_key", "your-api-key", "sk-xxx", "changeme"];

pub struct QuestionSynthesizer {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl QuestionSynthesizer {
    pub fn new(api_key: Option<String>, base_url: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .context("Failed to build LLM HTTP client")?;
        Ok(Self {
            client,
            api_key,
            base_url: base_url.into(),
            model: model.into(),
        })
    }

    /// Ask the model for `count` questions about `items`, dated `today`.
    pub async fn synthesize(&self, items: &[NewsItem], count: usize, today: NaiveDate) -> Result<Vec<String>> {
        let api_key = self.validated_key()?;

        let request = CompletionRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: prompt::build_system_prompt(),
                },
                ChatMessage {
                    role: "user",
                    content: prompt::build_user_prompt(items, count, today),
                },
            ],
            temperature: 0.7,
        };

        let reply = COMPLETION_RETRY
            .retry("question synthesis", is_transient, || self.complete(api_key, &request))
            .await?;
        debug!(%reply, "model reply");

        let questions = output::parse_questions(&reply)?;
        info!(requested = count, received = questions.len(), "questions synthesized");
        Ok(questions)
    }

    fn validated_key(&self) -> Result<&str> {
        let Some(key) = self.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty()) else {
            bail!("LLM_API_KEY is not set");
        };
        let lowered = key.to_ascii_lowercase();
        if PLACEHOLDER_KEYS.iter().any(|p| lowered.starts_with(p)) {
            bail!("LLM_API_KEY still holds a placeholder value");
        }
        Ok(key)
    }

    async fn complete(&self, api_key: &str, request: &CompletionRequest<'_>) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let resp: CompletionResponse = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(request)
            .send()
            .await
            .context("Failed to send completion request")?
            .error_for_status()
            .context("Completion endpoint returned an error")?
            .json()
            .await
            .context("Failed to parse completion response")?;

        resp.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| anyhow!("Completion response contained no message"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::news::tests::item;
    use mockito::Matcher;
    use serde_json::json;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 14).unwrap()
    }

    fn completion(content: &str) -> String {
        json!({ "choices": [{ "index": 0, "message": { "role": "assistant", "content": content } }] }).to_string()
    }

    #[tokio::test]
    async fn synthesizes_from_completion() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer sk-live")
            .match_body(Matcher::PartialJson(json!({ "model": "gpt-test" })))
            .with_body(completion("Here you go:\n[\"比特币今天为何上涨？\", \"ETH ETF 进展如何？\"]"))
            .create_async()
            .await;

        let synthesizer = QuestionSynthesizer::new(Some("sk-live".into()), server.url(), "gpt-test").unwrap();
        let questions = synthesizer
            .synthesize(&[item("etf", "coindesk")], 2, today())
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(questions, ["比特币今天为何上涨？", "ETH ETF 进展如何？"]);
    }

    #[tokio::test]
    async fn placeholder_key_fails_without_network() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .expect(0)
            .create_async()
            .await;

        for key in [None, Some(""), Some("your_api_key_here")] {
            let synthesizer =
                QuestionSynthesizer::new(key.map(String::from), server.url(), "gpt-test").unwrap();
            assert!(synthesizer.synthesize(&[item("a", "b")], 1, today()).await.is_err());
        }
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn http_errors_are_not_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .with_status(401)
            .expect(1)
            .create_async()
            .await;

        let synthesizer = QuestionSynthesizer::new(Some("sk-live".into()), server.url(), "gpt-test").unwrap();
        assert!(synthesizer.synthesize(&[item("a", "b")], 1, today()).await.is_err());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn reply_without_list_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_body(completion("Sorry, no questions today."))
            .create_async()
            .await;

        let synthesizer = QuestionSynthesizer::new(Some("sk-live".into()), server.url(), "gpt-test").unwrap();
        let err = synthesizer
            .synthesize(&[item("a", "b")], 1, today())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("No question list"));
    }
}
