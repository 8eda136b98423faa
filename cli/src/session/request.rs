use rand::distr::Alphanumeric;
use rand::Rng;
use serde::Serialize;
use uuid::Uuid;

const REQUEST_TYPE: &str = "chat_request";
const REQUEST_ID_LEN: usize = 20;

/// The single outbound message of a session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionRequest {
    request_id: String,
    #[serde(rename = "type")]
    kind: &'static str,
    messages: Vec<RequestMessage>,
}

#[derive(Debug, Clone, Serialize)]
struct RequestMessage {
    role: &'static str,
    content: Vec<ContentPart>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
}

impl SessionRequest {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            request_id: generate_request_id(),
            kind: REQUEST_TYPE,
            messages: vec![RequestMessage {
                role: "user",
                content: vec![ContentPart::Text {
                    text: question.into(),
                }],
            }],
        }
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }
}

/// 20 characters drawn uniformly from `[0-9A-Za-z]`.
pub fn generate_request_id() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(REQUEST_ID_LEN)
        .map(char::from)
        .collect()
}

/// Random version-4 UUID in hyphenated form.
pub fn generate_session_id() -> String {
    Uuid::new_v4().hyphenated().to_string()
}
