//! Per-session state machine.
//!
//! An [`Exchange`] owns everything one question/answer round needs: the
//! accumulated answer, the output channels and the settlement cell. It knows
//! nothing about the transport; the driver feeds it frames and transport
//! signals and asks it whether to hang up.
//!
//! ```text
//! Connecting --open--> Open --chat_start/chunk/reasoning--> Streaming
//!      \                 \                                     |
//!       \                 +------ end / error / close ---------+--> Resolved
//!        +--------------- error / close ----------------------------^
//! ```
//!
//! `end`, transport error and transport close race each other; the first one
//! to reach [`Exchange::settle`] decides the outcome.

use super::event::SessionEvent;
use crate::ui::channels::OutputChannels;
use crate::ui::user_messages;
use anyhow::{Error, Result};
use std::io::Write;
use std::sync::OnceLock;
use tracing::{trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Open,
    Streaming,
    Resolved,
}

/// What the driver should do after a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Close,
}

pub struct Exchange<W> {
    state: SessionState,
    response: String,
    outcome: OnceLock<Result<String>>,
    channels: OutputChannels<W>,
}

impl<W: Write> Exchange<W> {
    pub fn new(channels: OutputChannels<W>) -> Self {
        Self {
            state: SessionState::Connecting,
            response: String::new(),
            outcome: OnceLock::new(),
            channels,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn response(&self) -> &str {
        &self.response
    }

    pub fn is_resolved(&self) -> bool {
        self.outcome.get().is_some()
    }

    pub fn channels(&self) -> &OutputChannels<W> {
        &self.channels
    }

    pub fn on_open(&mut self) {
        if self.state == SessionState::Connecting {
            self.state = SessionState::Open;
        }
    }

    /// Handle one text frame. Undecodable frames are logged and skipped.
    pub fn on_frame(&mut self, text: &str) -> Flow {
        match SessionEvent::parse(text) {
            Ok(event) => self.on_event(event),
            Err(e) => {
                warn!("Skipping session frame: {e:#}");
                Flow::Continue
            }
        }
    }

    pub fn on_event(&mut self, event: SessionEvent) -> Flow {
        if self.is_resolved() {
            trace!(tag = event.tag(), "event after resolution ignored");
            return Flow::Continue;
        }

        match event {
            SessionEvent::Connected => user_messages::session_connected(),
            SessionEvent::ChatStart(start) => {
                user_messages::chat_started(start.title.as_deref());
                self.state = SessionState::Streaming;
            }
            SessionEvent::MessageChunk(chunk) => {
                self.state = SessionState::Streaming;
                let content = chunk.content.unwrap_or_default();
                self.response.push_str(&content);
                if let Err(e) = self.channels.write_content(&content) {
                    warn!("Failed to write answer chunk: {e}");
                }
            }
            SessionEvent::Reasoning(reasoning) => {
                self.state = SessionState::Streaming;
                if let Some(text) = reasoning.text_chunk.filter(|t| !t.is_empty()) {
                    self.channels.show_thinking(&text);
                }
            }
            SessionEvent::End => {
                self.channels.retire_indicator();
                if let Err(e) = self.channels.write_content("\n\n") {
                    warn!("Failed to terminate answer output: {e}");
                }
                user_messages::answer_complete();
                let answer = self.response.clone();
                if self.settle(Ok(answer)) {
                    return Flow::Close;
                }
            }
            SessionEvent::Custom(custom) => {
                if let Some(title) = custom.retrieval_done() {
                    user_messages::retrieval_done(title);
                }
            }
            SessionEvent::Unknown(tag) => trace!(tag = %tag, "unhandled session event"),
        }

        Flow::Continue
    }

    pub fn on_transport_error(&mut self, error: Error) {
        self.channels.retire_indicator();
        user_messages::transport_error(&format!("{error:#}"));
        self.settle(Err(error));
    }

    /// The connection ended; whatever has streamed so far is the answer.
    pub fn on_close(&mut self) {
        self.channels.retire_indicator();
        user_messages::connection_closed();
        let answer = self.response.clone();
        self.settle(Ok(answer));
    }

    /// Commit an outcome. Only the first call has any effect.
    pub fn settle(&mut self, outcome: Result<String>) -> bool {
        let committed = self.outcome.set(outcome).is_ok();
        if committed {
            self.state = SessionState::Resolved;
        } else {
            trace!("session already settled");
        }
        committed
    }

    /// The committed outcome. An exchange that never settled yields what
    /// has streamed so far, as a closed connection would.
    pub fn finish(self) -> Result<String> {
        match self.outcome.into_inner() {
            Some(outcome) => outcome,
            None => Ok(self.response),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::spinner::ThinkingIndicator;
    use anyhow::anyhow;
    use serde_json::json;

    fn exchange() -> Exchange<Vec<u8>> {
        let mut exchange = Exchange::new(OutputChannels::new(ThinkingIndicator::hidden(), Vec::new()));
        exchange.on_open();
        exchange
    }

    fn frame(event_type: &str, data: serde_json::Value) -> String {
        json!({ "event_type": event_type, "data": data }).to_string()
    }

    fn chunk(text: &str) -> String {
        frame("message_chunk", json!({ "content": text }))
    }

    fn reasoning(text: &str) -> String {
        frame("reasoning", json!({ "text_chunk": text }))
    }

    fn end() -> String {
        frame("end", json!({}))
    }

    #[test]
    fn full_stream_resolves_with_concatenated_chunks() {
        let mut ex = exchange();
        let frames = [
            frame("connected", json!({})),
            frame("chat_start", json!({ "title": "BTC" })),
            reasoning("思考中"),
            chunk("你好"),
            chunk("世界"),
        ];
        for f in &frames {
            assert_eq!(ex.on_frame(f), Flow::Continue);
        }
        assert_eq!(ex.state(), SessionState::Streaming);

        assert_eq!(ex.on_frame(&end()), Flow::Close);
        assert_eq!(ex.state(), SessionState::Resolved);
        assert_eq!(ex.finish().unwrap(), "你好世界");
    }

    #[test]
    fn chat_start_moves_to_streaming() {
        let mut ex = exchange();
        assert_eq!(ex.state(), SessionState::Open);
        ex.on_frame(&frame("connected", json!({})));
        assert_eq!(ex.state(), SessionState::Open);
        ex.on_frame(&frame("chat_start", json!({})));
        assert_eq!(ex.state(), SessionState::Streaming);
    }

    #[test]
    fn first_chunk_retires_indicator_before_content() {
        let mut ex = exchange();
        ex.on_frame(&reasoning("step one"));
        assert!(ex.channels().is_thinking());
        ex.on_frame(&reasoning("step two"));
        assert_eq!(ex.channels().thinking_text(), Some("step two"));

        ex.on_frame(&chunk("answer"));
        assert!(!ex.channels().is_thinking());
        assert_eq!(ex.channels().content().as_slice(), "\nanswer".as_bytes());
    }

    #[test]
    fn empty_chunk_still_retires_indicator() {
        let mut ex = exchange();
        ex.on_frame(&reasoning("thinking"));
        ex.on_frame(&frame("message_chunk", json!({})));
        assert!(!ex.channels().is_thinking());
        assert_eq!(ex.response(), "");
    }

    #[test]
    fn interleaved_events_do_not_affect_accumulation() {
        let mut ex = exchange();
        let frames = [
            chunk("a"),
            reasoning("r1"),
            frame("custom", json!({ "event_data": { "type": "RETRIEVER_DONE", "title": "t" } })),
            chunk("b"),
            frame("tool_calls", json!({ "tool_name": "search" })),
            "{ broken".to_string(),
            frame("message_chunk", json!({ "content": 7 })),
            reasoning("r2"),
            chunk("c"),
        ];
        for f in &frames {
            ex.on_frame(f);
        }
        assert_eq!(ex.response(), "abc");
        assert!(!ex.is_resolved());
    }

    #[test]
    fn duplicate_end_settles_once() {
        let mut ex = exchange();
        ex.on_frame(&chunk("first"));
        assert_eq!(ex.on_frame(&end()), Flow::Close);
        ex.on_frame(&chunk(" late"));
        assert_eq!(ex.on_frame(&end()), Flow::Continue);
        ex.on_close();
        ex.on_transport_error(anyhow!("reset"));
        assert_eq!(ex.finish().unwrap(), "first");
    }

    #[test]
    fn close_before_end_resolves_with_partial_text() {
        let mut ex = exchange();
        ex.on_frame(&reasoning("hmm"));
        ex.on_frame(&chunk("partial"));
        ex.on_close();
        assert!(!ex.channels().is_thinking());
        assert_eq!(ex.state(), SessionState::Resolved);
        assert_eq!(ex.finish().unwrap(), "partial");
    }

    #[test]
    fn close_without_any_content_resolves_empty() {
        let mut ex = exchange();
        ex.on_close();
        assert_eq!(ex.finish().unwrap(), "");
    }

    #[test]
    fn transport_error_rejects_and_retires_indicator() {
        let mut ex = exchange();
        ex.on_frame(&reasoning("deep thought"));
        ex.on_transport_error(anyhow!("connection reset"));
        assert!(!ex.channels().is_thinking());
        ex.on_close();
        let err = ex.finish().unwrap_err();
        assert!(err.to_string().contains("connection reset"));
    }

    #[test]
    fn error_before_open_rejects() {
        let mut ex = Exchange::new(OutputChannels::new(ThinkingIndicator::hidden(), Vec::new()));
        assert_eq!(ex.state(), SessionState::Connecting);
        ex.on_transport_error(anyhow!("refused"));
        assert_eq!(ex.state(), SessionState::Resolved);
        assert!(ex.finish().is_err());
    }

    #[test]
    fn end_after_error_does_not_override() {
        let mut ex = exchange();
        ex.on_frame(&chunk("x"));
        ex.on_transport_error(anyhow!("boom"));
        assert_eq!(ex.on_frame(&end()), Flow::Continue);
        assert!(ex.finish().is_err());
    }
}
