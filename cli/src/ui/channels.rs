use super::spinner::ThinkingIndicator;
use std::io::{self, Stdout, Write};

/// The two console outputs of a session: the ephemeral thinking indicator and
/// the permanent content stream.
///
/// Every content write retires the indicator first, so the two never share a
/// line.
pub struct OutputChannels<W> {
    indicator: ThinkingIndicator,
    content: W,
}

impl OutputChannels<Stdout> {
    pub fn stdout() -> Self {
        Self::new(ThinkingIndicator::new(), io::stdout())
    }
}

impl<W: Write> OutputChannels<W> {
    pub fn new(indicator: ThinkingIndicator, content: W) -> Self {
        Self { indicator, content }
    }

    pub fn is_thinking(&self) -> bool {
        self.indicator.is_active()
    }

    pub fn thinking_text(&self) -> Option<&str> {
        self.indicator.text()
    }

    pub fn show_thinking(&mut self, text: &str) {
        if self.indicator.is_active() {
            self.indicator.update(text);
        } else {
            self.indicator.activate(text);
        }
    }

    /// Retire the indicator, emitting a line break if it was showing.
    pub fn end_thinking(&mut self) -> io::Result<()> {
        if self.indicator.retire() {
            writeln!(self.content)?;
        }
        Ok(())
    }

    /// Retire the indicator without touching the content stream.
    pub fn retire_indicator(&mut self) {
        self.indicator.retire();
    }

    pub fn write_content(&mut self, text: &str) -> io::Result<()> {
        self.end_thinking()?;
        if !text.is_empty() {
            self.content.write_all(text.as_bytes())?;
            self.content.flush()?;
        }
        Ok(())
    }

    pub fn content(&self) -> &W {
        &self.content
    }
}
