use regex::Regex;
use std::sync::LazyLock;

use super::{escape_html, render_code, segment, FormattedSegment};
use crate::core::message::{Message, TranscriptRole};

static BOLD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*(.*?)\*\*").expect("bold pattern is valid"));
static ITALIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*(.*?)\*").expect("italic pattern is valid"));
static INLINE_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`([^`]+)`").expect("inline code pattern is valid"));

/// Escape prose, then apply the small inline markdown subset.
pub fn render_text(raw: &str) -> String {
    let escaped = escape_html(raw);
    let bold = BOLD.replace_all(&escaped, "<strong>${1}</strong>");
    let italic = ITALIC.replace_all(&bold, "<em>${1}</em>");
    let code = INLINE_CODE.replace_all(&italic, "<code class=\"inline-code\">${1}</code>");
    code.replace('\n', "<br>")
}

pub fn render_segment(segment: &FormattedSegment) -> String {
    match segment {
        FormattedSegment::Text { raw } => {
            format!("<div class=\"text-content\">{}</div>", render_text(raw))
        }
        FormattedSegment::Code { language, source } => format!(
            "<div class=\"code-block\"><div class=\"code-language\">{}</div>{}</div>",
            escape_html(language),
            render_code(language, source)
        ),
    }
}

/// Render a whole message body.
pub fn render_html(content: &str) -> String {
    segment(content).iter().map(render_segment).collect()
}

fn role_label(role: TranscriptRole) -> &'static str {
    match role {
        TranscriptRole::User => "You",
        TranscriptRole::Assistant => "Assistant",
        TranscriptRole::System => "System",
        TranscriptRole::Error => "Error",
    }
}

/// A standalone HTML document for a conversation.
pub fn render_transcript_html<'a>(
    messages: impl IntoIterator<Item = &'a Message>,
    model: &str,
) -> String {
    let mut body = String::new();
    for message in messages {
        body.push_str(&format!(
            "<section class=\"message {role}\">\n<header><span class=\"role\">{label}</span> \
             <time datetime=\"{ts}\">{shown}</time></header>\n{content}\n</section>\n",
            role = message.role.as_str(),
            label = role_label(message.role),
            ts = message.timestamp.to_rfc3339(),
            shown = message.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
            content = render_html(&message.content),
        ));
    }

    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>AlgoCroc conversation</title>\n</head>\n<body>\n\
         <h1>Conversation with {}</h1>\n{body}</body>\n</html>\n",
        escape_html(model)
    )
}
