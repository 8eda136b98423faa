//! Question list extraction from a free-form model reply.

use anyhow::{anyhow, bail, Context, Result};
use regex::Regex;
use std::sync::LazyLock;

/// From the first `[` to the last `]`, across lines.
static BRACKETED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)\[.*\]").expect("valid regex"));

/// Parse the bracketed JSON string array embedded in `response`, ignoring any
/// commentary or code fences around it. Blank entries are dropped.
pub(crate) fn parse_questions(response: &str) -> Result<Vec<String>> {
    let array = BRACKETED
        .find(response)
        .ok_or_else(|| anyhow!("No question list found in model reply"))?;

    let questions: Vec<String> =
        serde_json::from_str(array.as_str()).context("Question list is not a JSON array of strings")?;

    let questions: Vec<String> = questions
        .into_iter()
        .map(|q| q.trim().to_string())
        .filter(|q| !q.is_empty())
        .collect();

    if questions.is_empty() {
        bail!("Model reply contained an empty question list");
    }
    Ok(questions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_raw_array() {
        let questions = parse_questions(r#"["比特币为何上涨？", "ETH 质押收益如何？"]"#).unwrap();
        assert_eq!(questions, ["比特币为何上涨？", "ETH 质押收益如何？"]);
    }

    #[test]
    fn tolerates_commentary_and_fences() {
        let reply = "Sure! Here are today's questions:\n```json\n[\n  \"Q1 [draft]?\",\n  \"  Q2  \",\n  \"\"\n]\n```\nLet me know if you need more.";
        assert_eq!(parse_questions(reply).unwrap(), ["Q1 [draft]?", "Q2"]);
    }

    #[test]
    fn rejects_missing_or_malformed_lists() {
        assert!(parse_questions("I could not think of anything.").is_err());
        assert!(parse_questions("[1, 2, 3]").is_err());
        assert!(parse_questions("[]").is_err());
    }
}
