//! Flat `KEY=value` configuration store.
//!
//! Updates rewrite individual lines in place; every other line (comments,
//! blank lines, unrelated keys) is left byte-for-byte untouched.

use anyhow::{Context, Result};
use regex::{NoExpand, Regex};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const ACCESS_TOKEN_KEY: &str = "ACCESS_TOKEN";
pub const REFRESH_TOKEN_KEY: &str = "REFRESH_TOKEN";
pub const DEVICE_ID_KEY: &str = "DEVICE_ID";

const TEMPLATE: &str = r#"# Access token (copy the x-access-token value from a logged-in browser session)
ACCESS_TOKEN=

# Refresh token (used to renew ACCESS_TOKEN)
REFRESH_TOKEN=

# Device id (copy the x-device-id value from a logged-in browser session)
DEVICE_ID=

# Chat mode (V2, V2_INSTANT, V2_THINKING)
SESSION_TYPE=V2

# Questions per run, inclusive range "min,max"
QUESTION_COUNT_RANGE=1,3

# Minutes to wait between questions, inclusive range "min,max"
QUESTION_INTERVAL_RANGE=1,5

# OpenAI-compatible completion endpoint used to write the questions
LLM_API_KEY=
LLM_API_BASE_URL=https://api.openai.com/v1
LLM_MODEL=gpt-4o-mini

# Cron expression with seconds field, evaluated in SCHEDULE_TIMEZONE
SCHEDULE_CRON=0 0 8 * * *
SCHEDULE_TIMEZONE=Asia/Shanghai
"#;

#[derive(Debug, Clone)]
pub struct EnvFile {
    path: PathBuf,
}

impl EnvFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persist a renewed credential pair.
    pub async fn update_tokens(&self, access_token: &str, refresh_token: &str) -> Result<()> {
        self.update(&[
            (ACCESS_TOKEN_KEY, access_token),
            (REFRESH_TOKEN_KEY, refresh_token),
        ])
        .await
    }

    /// Set each key's value, replacing its first line or appending a new one.
    pub async fn update(&self, entries: &[(&str, &str)]) -> Result<()> {
        let mut content = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read {}", self.path.display()))?;

        for (key, value) in entries {
            content = set_key(&content, key, value)?;
        }

        tokio::fs::write(&self.path, content)
            .await
            .with_context(|| format!("Failed to write {}", self.path.display()))?;

        debug!(path = %self.path.display(), keys = entries.len(), "configuration updated");
        Ok(())
    }

    /// Write the commented template. Returns `false` if the file already exists.
    pub async fn write_template(&self) -> Result<bool> {
        if tokio::fs::try_exists(&self.path)
            .await
            .with_context(|| format!("Failed to probe {}", self.path.display()))?
        {
            return Ok(false);
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        tokio::fs::write(&self.path, TEMPLATE)
            .await
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        Ok(true)
    }
}

/// Replace the first `KEY=...` line. Values are inserted literally.
pub(crate) fn set_key(content: &str, key: &str, value: &str) -> Result<String> {
    let pattern = Regex::new(&format!(r"(?m)^{}=[^\r\n]*", regex::escape(key)))
        .with_context(|| format!("Invalid key pattern for {key}"))?;
    let line = format!("{key}={value}");

    if pattern.is_match(content) {
        return Ok(pattern.replacen(content, 1, NoExpand(line.as_str())).into_owned());
    }

    warn!("{key} not present in configuration file, appending it");
    let mut out = content.to_string();
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(&line);
    out.push('\n');
    Ok(out)
}
