//! Prompt construction for question synthesis.

use crate::news::{truncate_chars, NewsItem};
use chrono::{DateTime, NaiveDate};
use std::fmt::Write;

pub(crate) const MAX_ITEMS: usize = 60;
pub(crate) const MAX_BODY_CHARS: usize = 300;

pub(crate) fn build_system_prompt() -> String {
    r#"You are a research editor for a crypto market intelligence desk.
You read the day's headlines and write the questions a curious, well-informed trader would ask an AI research assistant about them.

## Rules
1. Each question must be answerable from public market data, on-chain data or news coverage.
2. Prefer questions about concrete assets, protocols, events and their likely market impact.
3. Do not repeat the same topic twice; spread questions across different stories.
4. Write every question in Simplified Chinese, as one sentence, without numbering.

## Output Format
Respond with ONLY a JSON array of strings, for example:
["比特币 ETF 今日资金流入对价格有何影响？", "以太坊升级后 Gas 费用变化如何？"]"#
        .to_string()
}

/// User prompt embedding `today` and up to [`MAX_ITEMS`] items.
pub(crate) fn build_user_prompt(items: &[NewsItem], count: usize, today: NaiveDate) -> String {
    let mut prompt = format!(
        "Today is {}. Here are the latest crypto news items:\n\n",
        today.format("%Y-%m-%d")
    );

    for (i, item) in items.iter().take(MAX_ITEMS).enumerate() {
        let _ = writeln!(
            prompt,
            "{}. [{}] [{}] {}",
            i + 1,
            item.source,
            short_timestamp(&item.published_at),
            item.title.trim()
        );
        let body = truncate_chars(item.body.trim(), MAX_BODY_CHARS);
        if !body.is_empty() {
            let _ = writeln!(prompt, "   {body}");
        }
    }

    let _ = write!(
        prompt,
        "\nBased on these items, write exactly {count} question{} as a JSON array of strings.",
        if count == 1 { "" } else { "s" }
    );
    prompt
}

/// `MM-DD HH:MM` for RFC 3339 input, the raw value otherwise.
fn short_timestamp(published_at: &str) -> String {
    DateTime::parse_from_rfc3339(published_at)
        .map(|t| t.format("%m-%d %H:%M").to_string())
        .unwrap_or_else(|_| published_at.to_string())
}
