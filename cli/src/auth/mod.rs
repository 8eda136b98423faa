//! Access/refresh credential handling.
//!
//! [`CredentialStore`] owns the process-wide pair. It is lent to each session
//! by `&mut`, renews the access token shortly before it expires and writes
//! the renewed pair back to the configuration file.

mod refresh;
pub mod token;

pub use refresh::TokenClient;

use crate::config::env_file::EnvFile;
use crate::ui::user_messages;
use anyhow::{Context, Result};
use chrono::Utc;
use std::fmt;
use tracing::debug;

#[derive(Clone, PartialEq, Eq)]
pub struct CredentialPair {
    access_token: String,
    refresh_token: String,
}

impl CredentialPair {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn refresh_token(&self) -> &str {
        &self.refresh_token
    }
}

impl fmt::Debug for CredentialPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialPair")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

pub struct CredentialStore {
    pair: CredentialPair,
    device_id: String,
    env_file: EnvFile,
    client: TokenClient,
    buffer_secs: i64,
}

impl CredentialStore {
    pub fn new(pair: CredentialPair, device_id: String, env_file: EnvFile, client: TokenClient) -> Self {
        Self {
            pair,
            device_id,
            env_file,
            client,
            buffer_secs: token::DEFAULT_REFRESH_BUFFER_SECS,
        }
    }

    pub fn with_buffer_secs(mut self, buffer_secs: i64) -> Self {
        self.buffer_secs = buffer_secs;
        self
    }

    pub fn pair(&self) -> &CredentialPair {
        &self.pair
    }

    /// A currently valid access token, refreshing first if needed.
    pub async fn access_token(&mut self) -> Result<String> {
        self.access_token_at(Utc::now().timestamp()).await
    }

    pub async fn access_token_at(&mut self, now_unix: i64) -> Result<String> {
        if token::is_expiring_soon(self.pair.access_token(), now_unix, self.buffer_secs) {
            self.refresh().await?;
        } else {
            debug!(
                expires_at = token::expiry(self.pair.access_token()),
                "access token still valid"
            );
        }
        Ok(self.pair.access_token().to_string())
    }

    /// Renew unconditionally and persist the new pair.
    pub async fn refresh(&mut self) -> Result<()> {
        let renewed = self
            .client
            .refresh(&self.pair, &self.device_id)
            .await
            .context("Failed to refresh access token")?;

        // The server has already rotated the refresh token; keep the new pair
        // even if the file cannot be written.
        self.pair = renewed;
        user_messages::token_refreshed(token::expiry(self.pair.access_token()));

        self.env_file
            .update_tokens(self.pair.access_token(), self.pair.refresh_token())
            .await
            .context("Failed to persist refreshed tokens")
    }
}
