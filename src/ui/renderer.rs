//! Line-oriented terminal output for a chat session.

use ratatui::crossterm::style::{ContentStyle, Stylize};
use std::cell::Cell;
use std::io::{self, Write};

use crate::core::message::{Message, TranscriptRole};
use crate::core::session::Renderer;
use crate::ui::markdown::{detab, normalize_language, segment, FormattedSegment};

const CODE_RULE: &str = "────";

/// Prints committed messages and streamed replies to stdout.
///
/// User messages are not echoed since the user just typed them.
pub struct TerminalRenderer {
    color: bool,
    /// Bytes of the in-progress reply already written.
    printed: Cell<usize>,
}

impl TerminalRenderer {
    pub fn new(color: bool) -> Self {
        Self {
            color,
            printed: Cell::new(0),
        }
    }

    fn paint(&self, text: &str, style: ContentStyle) -> String {
        if self.color {
            style.apply(text).to_string()
        } else {
            text.to_string()
        }
    }

    /// Terminal rendering of an assistant reply: prose as-is, code blocks
    /// framed by a language rule with tabs expanded.
    pub fn format_reply(&self, content: &str) -> String {
        let mut out = String::new();
        for part in segment(content) {
            match part {
                FormattedSegment::Text { raw } => {
                    out.push_str(raw.trim_matches('\n'));
                    out.push('\n');
                }
                FormattedSegment::Code { language, source } => {
                    let header =
                        format!("{CODE_RULE} {} {CODE_RULE}", normalize_language(&language));
                    out.push_str(&self.paint(&header, ContentStyle::new().dark_grey()));
                    out.push('\n');
                    for line in source.lines() {
                        out.push_str("  ");
                        out.push_str(&self.paint(&detab(line), ContentStyle::new().yellow()));
                        out.push('\n');
                    }
                    out.push_str(&self.paint(CODE_RULE, ContentStyle::new().dark_grey()));
                    out.push('\n');
                }
            }
        }
        out
    }

    pub fn format_message(&self, message: &Message) -> Option<String> {
        match message.role {
            TranscriptRole::User => None,
            TranscriptRole::Assistant => Some(self.format_reply(&message.content)),
            TranscriptRole::System => Some(format!(
                "{}\n",
                self.paint(&message.content, ContentStyle::new().dark_grey())
            )),
            TranscriptRole::Error => Some(format!(
                "{}\n",
                self.paint(&format!("❌ {}", message.content), ContentStyle::new().red())
            )),
        }
    }

    fn write(&self, text: &str) {
        let mut stdout = io::stdout().lock();
        let _ = stdout.write_all(text.as_bytes());
        let _ = stdout.flush();
    }
}

impl Renderer for TerminalRenderer {
    fn message_added(&self, message: &Message) {
        if let Some(text) = self.format_message(message) {
            self.write(&text);
        }
    }

    fn stream_started(&self) {
        self.printed.set(0);
    }

    fn streaming_update(&self, content: &str) {
        let already = self.printed.get();
        if let Some(delta) = content.get(already..) {
            self.write(delta);
            self.printed.set(content.len());
        }
    }

    fn stream_finished(&self, _committed: Option<&Message>) {
        if self.printed.replace(0) > 0 {
            self.write("\n");
        }
    }

    fn notice(&self, text: &str) {
        self.write(&format!("{}\n", self.paint(text, ContentStyle::new().cyan())));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replies_frame_code_blocks_and_expand_tabs() {
        let renderer = TerminalRenderer::new(false);
        let out = renderer.format_reply("Try this:\n```py\nif x:\n\treturn 1\n```\nDone.");
        assert_eq!(
            out,
            "Try this:\n──── python ────\n  if x:\n      return 1\n────\nDone.\n"
        );
    }

    #[test]
    fn user_messages_are_not_echoed() {
        let renderer = TerminalRenderer::new(false);
        assert_eq!(renderer.format_message(&Message::user("hi")), None);
        assert_eq!(
            renderer.format_message(&Message::error("Failed")).as_deref(),
            Some("❌ Failed\n")
        );
        assert_eq!(
            renderer.format_message(&Message::system("Switched")).as_deref(),
            Some("Switched\n")
        );
    }

    #[test]
    fn plain_output_has_no_escape_sequences() {
        let renderer = TerminalRenderer::new(false);
        let out = renderer.format_reply("hello\n```\nx\n```");
        assert!(!out.contains('\u{1b}'));
        assert!(out.starts_with("hello\n──── text ────\n"));
    }

    #[test]
    fn streaming_tracks_how_much_was_printed() {
        let renderer = TerminalRenderer::new(false);
        renderer.stream_started();
        renderer.streaming_update("Hel");
        assert_eq!(renderer.printed.get(), 3);
        renderer.streaming_update("Hello");
        assert_eq!(renderer.printed.get(), 5);
        renderer.stream_finished(None);
        assert_eq!(renderer.printed.get(), 0);
    }
}
