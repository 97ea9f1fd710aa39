//! Jsonmend - Model-output sanitizer
//!
//! Normalizes raw chat-completion text into something safe to hand to the
//! JSON parser: reasoning blocks are removed and code fences stripped.

use regex::Regex;

/// Sanitizer for raw assistant messages.
pub struct Sanitizer {
    think_block: Regex,
}

impl Default for Sanitizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Sanitizer {
    pub fn new() -> Self {
        Self {
            // (?s) so reasoning spans may contain newlines.
            think_block: Regex::new(r"(?s)<think>.*?</think>")
                .expect("valid regex: think block"),
        }
    }

    /// Remove model reasoning delimited by `<think>` tags.
    ///
    /// Some endpoints emit the closing tag without ever opening one; in that
    /// case everything up to and including the first `</think>` goes.
    /// Otherwise all paired spans are removed.
    pub fn strip_think_tags(&self, message: &str) -> String {
        if message.contains("</think>") && !message.contains("<think>") {
            if let Some((_, after)) = message.split_once("</think>") {
                return after.to_string();
            }
        }
        self.think_block.replace_all(message, "").trim().to_string()
    }

    /// Clean a raw assistant message down to (hopefully) bare JSON.
    ///
    /// The result is not guaranteed to parse; callers attempt the parse and
    /// decide what a failure means.
    pub fn clean(&self, message: &str) -> String {
        let stripped = self.strip_think_tags(message);
        let mut text = stripped.trim();
        if let Some(rest) = text.strip_prefix("```json") {
            text = rest;
        }
        if let Some(rest) = text.strip_suffix("```") {
            text = rest;
        }
        text.trim().to_string()
    }
}
