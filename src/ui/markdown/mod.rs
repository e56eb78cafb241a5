//! Message formatting: split replies into prose and fenced code, then render
//! them as escaped HTML.
//!
//! Escaping always happens before any markup is introduced, so text coming
//! from a model can never inject tags into the rendered output.

mod code;
mod render;

#[cfg(test)]
mod tests;

use regex::Regex;
use std::sync::LazyLock;

pub(crate) use code::detab;
pub use code::{normalize_language, render_code};
pub use render::{render_html, render_segment, render_text, render_transcript_html};

/// A run of prose or a fenced code block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormattedSegment {
    Text { raw: String },
    Code { language: String, source: String },
}

pub const DEFAULT_CODE_LANGUAGE: &str = "text";

static FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"```[ \t]*([\w\-+#]*)[ \t]*\r?\n?([\s\S]*?)```").expect("fence pattern is valid")
});

/// Split `input` into text and code segments in order of appearance.
///
/// Whitespace-only prose between fences is dropped. Input without any fence
/// becomes a single text segment; empty input yields nothing.
pub fn segment(input: &str) -> Vec<FormattedSegment> {
    if input.is_empty() {
        return Vec::new();
    }

    let mut segments = Vec::new();
    let mut last_end = 0;
    for caps in FENCE.captures_iter(input) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        push_text(&mut segments, &input[last_end..whole.start()]);

        let language = caps
            .get(1)
            .map(|m| m.as_str())
            .filter(|lang| !lang.is_empty())
            .unwrap_or(DEFAULT_CODE_LANGUAGE);
        let source = caps.get(2).map(|m| m.as_str().trim()).unwrap_or_default();
        segments.push(FormattedSegment::Code {
            language: language.to_string(),
            source: source.to_string(),
        });
        last_end = whole.end();
    }
    push_text(&mut segments, &input[last_end..]);

    if segments.is_empty() {
        segments.push(FormattedSegment::Text {
            raw: input.to_string(),
        });
    }
    segments
}

fn push_text(segments: &mut Vec<FormattedSegment>, text: &str) {
    if !text.trim().is_empty() {
        segments.push(FormattedSegment::Text {
            raw: text.to_string(),
        });
    }
}

/// Escape the five HTML-significant characters.
pub fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
