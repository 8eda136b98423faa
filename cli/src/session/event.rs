//! Inbound session events.
//!
//! Frames are `{ "event_type": "...", "data": { ... } }`. The tag is read
//! first and the payload is then decoded into the shape fixed for that tag,
//! so an unknown tag never fails and a malformed payload fails only for the
//! tag it belongs to.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

/// Marker carried by `custom` events once retrieval has finished.
pub const RETRIEVER_DONE: &str = "RETRIEVER_DONE";

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Connected,
    ChatStart(ChatStart),
    MessageChunk(MessageChunk),
    Reasoning(Reasoning),
    End,
    Custom(Custom),
    /// Any tag without local handling.
    Unknown(String),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ChatStart {
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MessageChunk {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Reasoning {
    #[serde(default)]
    pub text_chunk: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Custom {
    #[serde(default)]
    pub event_data: Option<CustomEventData>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CustomEventData {
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

impl Custom {
    /// Title of a finished retrieval, if this event reports one.
    pub fn retrieval_done(&self) -> Option<Option<&str>> {
        self.event_data
            .as_ref()
            .filter(|d| d.kind.as_deref() == Some(RETRIEVER_DONE))
            .map(|d| d.title.as_deref())
    }
}

#[derive(Deserialize)]
struct Frame {
    event_type: String,
    #[serde(default)]
    data: Value,
}

impl SessionEvent {
    pub fn parse(text: &str) -> Result<Self> {
        let frame: Frame = serde_json::from_str(text).context("Malformed session frame")?;

        let event = match frame.event_type.as_str() {
            "connected" => Self::Connected,
            "chat_start" => Self::ChatStart(payload(frame.data, "chat_start")?),
            "message_chunk" => Self::MessageChunk(payload(frame.data, "message_chunk")?),
            "reasoning" => Self::Reasoning(payload(frame.data, "reasoning")?),
            "end" => Self::End,
            "custom" => Self::Custom(payload(frame.data, "custom")?),
            _ => Self::Unknown(frame.event_type),
        };

        Ok(event)
    }

    pub fn tag(&self) -> &str {
        match self {
            Self::Connected => "connected",
            Self::ChatStart(_) => "chat_start",
            Self::MessageChunk(_) => "message_chunk",
            Self::Reasoning(_) => "reasoning",
            Self::End => "end",
            Self::Custom(_) => "custom",
            Self::Unknown(tag) => tag,
        }
    }
}

/// Missing or `null` data decodes as the payload's default.
fn payload<T: DeserializeOwned + Default>(data: Value, tag: &str) -> Result<T> {
    if data.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(data).with_context(|| format!("Malformed `{tag}` payload"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_tags() {
        assert_eq!(
            SessionEvent::parse(r#"{"event_type":"connected","data":{"session_id":"x"}}"#).unwrap(),
            SessionEvent::Connected
        );
        assert_eq!(
            SessionEvent::parse(r#"{"event_type":"message_chunk","data":{"content":"你好"}}"#)
                .unwrap(),
            SessionEvent::MessageChunk(MessageChunk {
                content: Some("你好".into())
            })
        );
        assert_eq!(
            SessionEvent::parse(r#"{"event_type":"reasoning","data":{"text_chunk":"思考中"}}"#)
                .unwrap(),
            SessionEvent::Reasoning(Reasoning {
                text_chunk: Some("思考中".into())
            })
        );
        assert_eq!(
            SessionEvent::parse(r#"{"event_type":"end"}"#).unwrap(),
            SessionEvent::End
        );
    }

    #[test]
    fn unknown_tags_are_preserved() {
        let event =
            SessionEvent::parse(r#"{"event_type":"tool_calls","data":{"tool_name":"x"}}"#).unwrap();
        assert_eq!(event, SessionEvent::Unknown("tool_calls".into()));
        assert_eq!(event.tag(), "tool_calls");
    }

    #[test]
    fn custom_retrieval_marker() {
        let event = SessionEvent::parse(
            r#"{"event_type":"custom","data":{"event_data":{"type":"RETRIEVER_DONE","title":"12 sources"}}}"#,
        )
        .unwrap();
        let SessionEvent::Custom(custom) = event else {
            panic!("expected custom event");
        };
        assert_eq!(custom.retrieval_done(), Some(Some("12 sources")));

        let other = Custom {
            event_data: Some(CustomEventData {
                kind: Some("PROGRESS".into()),
                title: None,
            }),
        };
        assert_eq!(other.retrieval_done(), None);
    }

    #[test]
    fn malformed_frames_and_payloads_are_errors() {
        assert!(SessionEvent::parse("not json").is_err());
        assert!(SessionEvent::parse(r#"{"data":{}}"#).is_err());
        assert!(SessionEvent::parse(r#"{"event_type":"message_chunk","data":{"content":42}}"#).is_err());
    }

    #[test]
    fn null_data_uses_defaults() {
        assert_eq!(
            SessionEvent::parse(r#"{"event_type":"chat_start","data":null}"#).unwrap(),
            SessionEvent::ChatStart(ChatStart::default())
        );
    }
}
