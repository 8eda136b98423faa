//! Styled narration of a session, emitted on the `plain` log target.

use chrono::{TimeZone, Utc};
use dialoguer::console::style;
use std::fmt::Display;
use tracing::info;

pub(crate) fn connection_open() {
    info!(target: "plain", "{} {}", style("✔").green(), style("WebSocket connection established").dim());
}

pub(crate) fn request_sent() {
    info!(target: "plain", "{} {}", style("✔").green(), style("Question sent").dim());
}

pub(crate) fn session_connected() {
    info!(target: "plain", "{} {}", style("✔").green(), style("Connected to chat session").dim());
}

pub(crate) fn chat_started(title: Option<&str>) {
    info!(target: "plain",
        "{} {}",
        style("◆").cyan(),
        style(format!("Chat started: {}", title.unwrap_or_default())).dim()
    );
}

pub(crate) fn retrieval_done(title: Option<&str>) {
    info!(target: "plain",
        "{} {}",
        style("🔍").blue(),
        style(format!("Retrieval complete: {}", title.unwrap_or_default())).dim()
    );
}

pub(crate) fn answer_complete() {
    info!(target: "plain", "{} {}", style("✔").green(), style("Answer complete").dim());
}

pub(crate) fn connection_closed() {
    info!(target: "plain", "{}", style("○ Connection closed").dim());
}

pub(crate) fn transport_error(error: &dyn Display) {
    info!(target: "plain", "{} {} {}", style("✘").red(), style("WebSocket error:").dim(), style(error).red());
}

pub(crate) fn token_refreshed(expires_at: Option<i64>) {
    let until = expires_at
        .and_then(|exp| Utc.timestamp_opt(exp, 0).single())
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| "unknown".to_string());
    info!(target: "plain",
        "{} {}",
        style("✔").green(),
        style(format!("Access token refreshed (valid until {until})")).dim()
    );
}
