use dialoguer::console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::{io::IsTerminal, time::Duration};

/// Ephemeral "thinking" line shown while the assistant streams reasoning.
///
/// Drawn on stderr only when stderr is a TTY; otherwise the indicator still
/// tracks its lifecycle but renders nothing.
pub struct ThinkingIndicator {
    bar: Option<ProgressBar>,
    text: String,
    visible: bool,
}

impl Default for ThinkingIndicator {
    fn default() -> Self {
        Self::new()
    }
}

impl ThinkingIndicator {
    pub fn new() -> Self {
        Self {
            bar: None,
            text: String::new(),
            visible: std::io::stderr().is_terminal(),
        }
    }

    /// Never draws.
    pub fn hidden() -> Self {
        Self {
            bar: None,
            text: String::new(),
            visible: false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.bar.is_some()
    }

    /// Text currently displayed, if active.
    pub fn text(&self) -> Option<&str> {
        self.bar.as_ref().map(|_| self.text.as_str())
    }

    /// Start the indicator. An already active indicator just changes its text.
    pub fn activate(&mut self, text: &str) {
        if self.bar.is_some() {
            self.update(text);
            return;
        }

        let bar = if self.visible {
            let bar = ProgressBar::new_spinner();
            bar.set_style(
                ProgressStyle::with_template("{prefix} {spinner} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner())
                    .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ "),
            );
            bar.set_prefix(style("[thinking]").dim().to_string());
            bar.enable_steady_tick(Duration::from_millis(80));
            bar
        } else {
            ProgressBar::hidden()
        };

        self.bar = Some(bar);
        self.update(text);
    }

    pub fn update(&mut self, text: &str) {
        if let Some(bar) = &self.bar {
            self.text = text.to_string();
            bar.set_message(style(text).magenta().to_string());
        }
    }

    /// Clear the line. Returns whether the indicator was active.
    pub fn retire(&mut self) -> bool {
        match self.bar.take() {
            Some(bar) => {
                bar.finish_and_clear();
                self.text.clear();
                true
            }
            None => false,
        }
    }
}

impl Drop for ThinkingIndicator {
    fn drop(&mut self) {
        self.retire();
    }
}
