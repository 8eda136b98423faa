use super::CredentialPair;
use anyhow::{Context, Result};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};

const REFRESH_ROUTE: &str = "/muninn/v2/auth/refresh";
const WEB_ORIGIN: &str = "https://asksurf.ai";

/// Client for the token renewal endpoint.
#[derive(Debug, Clone)]
pub struct TokenClient {
    client: Client,
    refresh_url: Url,
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

#[derive(Deserialize)]
struct RefreshEnvelope {
    data: RefreshedTokens,
}

#[derive(Deserialize)]
struct RefreshedTokens {
    access_token: String,
    refresh_token: String,
}

impl TokenClient {
    pub fn new(api_base: &str) -> Result<Self> {
        let refresh_url = Url::parse(&format!("{}{REFRESH_ROUTE}", api_base.trim_end_matches('/')))
            .with_context(|| format!("Invalid API base URL: {api_base}"))?;

        Ok(Self {
            client: Client::new(),
            refresh_url,
        })
    }

    /// Exchange the current pair for a new one.
    pub async fn refresh(&self, current: &CredentialPair, device_id: &str) -> Result<CredentialPair> {
        let resp = self
            .client
            .post(self.refresh_url.clone())
            .bearer_auth(current.access_token())
            .header("Origin", WEB_ORIGIN)
            .header("Referer", format!("{WEB_ORIGIN}/"))
            .header("x-device-id", device_id)
            .json(&RefreshRequest {
                refresh_token: current.refresh_token(),
            })
            .send()
            .await
            .context("Token refresh request failed")?
            .error_for_status()
            .context("Token refresh rejected")?;

        let envelope: RefreshEnvelope = resp
            .json()
            .await
            .context("Failed to parse token refresh response")?;

        Ok(CredentialPair::new(
            envelope.data.access_token,
            envelope.data.refresh_token,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[tokio::test]
    async fn sends_bearer_device_and_refresh_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", REFRESH_ROUTE)
            .match_header("authorization", "Bearer old-access")
            .match_header("x-device-id", "device-1")
            .match_header("origin", WEB_ORIGIN)
            .match_body(Matcher::Json(serde_json::json!({ "refresh_token": "old-refresh" })))
            .with_header("content-type", "application/json")
            .with_body(r#"{"data":{"access_token":"A2","refresh_token":"R2","expires_in":3600}}"#)
            .create_async()
            .await;

        let client = TokenClient::new(&server.url()).unwrap();
        let pair = client
            .refresh(&CredentialPair::new("old-access", "old-refresh"), "device-1")
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(pair.access_token(), "A2");
        assert_eq!(pair.refresh_token(), "R2");
    }

    #[tokio::test]
    async fn error_status_is_reported() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", REFRESH_ROUTE)
            .with_status(401)
            .create_async()
            .await;

        let client = TokenClient::new(&server.url()).unwrap();
        let err = client
            .refresh(&CredentialPair::new("a", "r"), "d")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("rejected"));
    }
}
