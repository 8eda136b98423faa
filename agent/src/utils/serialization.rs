use chrono::{DateTime, SecondsFormat, Utc};
use serde::{de, Deserialize, Deserializer};
use serde_json::Value;

/// Unix seconds that arrive either as a JSON number (integer or float) or as
/// a numeric string. Missing, `null` and blank values become `None`.
pub(crate) fn de_opt_unix_seconds<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<Value>::deserialize(deserializer)?;
    match v {
        None => Ok(None),
        Some(Value::Number(n)) => Ok(n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))),
        Some(Value::String(s)) => {
            let s = s.trim();
            if s.is_empty() {
                Ok(None)
            } else {
                s.parse::<f64>()
                    .map(|f| Some(f as i64))
                    .map_err(|_| de::Error::custom(format!("could not parse timestamp from string: {s}")))
            }
        }
        Some(other) => Err(de::Error::custom(format!(
            "expected number or string, got: {other}"
        ))),
    }
}

/// Accepts `"a|b"`, `["a","b"]` or nothing, always yielding a `|`-joined label.
pub(crate) fn de_category_label<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<Value>::deserialize(deserializer)?;
    let Some(v) = v else { return Ok(String::new()) };

    match v {
        Value::String(s) => Ok(s),
        Value::Array(arr) => Ok(arr
            .into_iter()
            .map(|item| match item {
                Value::String(s) => s,
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join("|")),
        Value::Null => Ok(String::new()),
        other => Ok(other.to_string()),
    }
}

/// RFC 3339 with millisecond precision, `Z` suffix. Unrepresentable or
/// missing timestamps render as the empty string.
pub(crate) fn unix_to_rfc3339(secs: Option<i64>) -> String {
    secs.and_then(|s| DateTime::<Utc>::from_timestamp(s, 0))
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_default()
}
