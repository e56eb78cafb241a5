use super::*;
use crate::core::message::Message;
use chrono::{TimeZone, Utc};

fn text(raw: &str) -> FormattedSegment {
    FormattedSegment::Text {
        raw: raw.to_string(),
    }
}

fn code(language: &str, source: &str) -> FormattedSegment {
    FormattedSegment::Code {
        language: language.to_string(),
        source: source.to_string(),
    }
}

fn squash(s: &str) -> String {
    s.split_whitespace().collect()
}

#[test]
fn prose_then_fenced_code() {
    let input = "Hello **world**\n```js\nconsole.log(1)\n```";
    let segments = segment(input);
    assert_eq!(
        segments,
        vec![text("Hello **world**\n"), code("js", "console.log(1)")]
    );
    assert_eq!(render_text("Hello **world**"), "Hello <strong>world</strong>");
}

#[test]
fn untagged_fences_default_to_text() {
    assert_eq!(segment("```\nplain\n```"), vec![code("text", "plain")]);
}

#[test]
fn whitespace_between_fences_is_dropped() {
    let segments = segment("```rs\nfn a() {}\n```\n\n```py\nprint(1)\n```\ntail");
    assert_eq!(
        segments,
        vec![code("rs", "fn a() {}"), code("py", "print(1)"), text("\ntail")]
    );
}

#[test]
fn input_without_fences_is_one_text_segment() {
    assert_eq!(segment("just words"), vec![text("just words")]);
    assert_eq!(segment("   "), vec![text("   ")]);
    assert!(segment("").is_empty());
}

#[test]
fn unbalanced_fence_stays_text() {
    assert_eq!(segment("```js\nlet x;"), vec![text("```js\nlet x;")]);
}

#[test]
fn segmentation_round_trips_text_and_code() {
    let cases = [
        "intro\n```js\nconst a = 1;\n```\noutro",
        "```\nonly code\n```",
        "a\n```c++\nint main() {}\n```\nb\n```python\nx = `tick`\n```\nc",
        "no fences at all\nsecond line",
    ];
    for input in cases {
        let rebuilt: String = segment(input)
            .into_iter()
            .map(|s| match s {
                FormattedSegment::Text { raw } => raw,
                FormattedSegment::Code { language, source } => {
                    let tag = if language == DEFAULT_CODE_LANGUAGE { "" } else { language.as_str() };
                    format!("```{tag}\n{source}\n```")
                }
            })
            .collect();
        assert_eq!(squash(&rebuilt), squash(input), "case: {input}");
    }
}

#[test]
fn rendered_text_never_contains_raw_tags() {
    let hostile = [
        "<script>alert('x')</script>",
        "**<img src=x onerror=alert(1)>**",
        "`<b>` & *<i>*",
        "a > b && c < d",
    ];
    for raw in hostile {
        let html = render_text(raw);
        for tag in ["<script", "<img", "<b>", "<i>"] {
            assert!(!html.contains(tag), "{raw} rendered as {html}");
        }
        let stripped = html
            .replace("<strong>", "")
            .replace("</strong>", "")
            .replace("<em>", "")
            .replace("</em>", "")
            .replace("<code class=\"inline-code\">", "")
            .replace("</code>", "")
            .replace("<br>", "");
        assert!(!stripped.contains('<') && !stripped.contains('>'));
    }
}

#[test]
fn inline_markup_and_line_breaks() {
    assert_eq!(
        render_text("*soft* and `code`\nnext"),
        "<em>soft</em> and <code class=\"inline-code\">code</code><br>next"
    );
    assert_eq!(render_text("Tom & \"Jerry\""), "Tom &amp; &quot;Jerry&quot;");
}

#[test]
fn code_is_escaped_verbatim() {
    let html = render_code("js", "if (a < b && **c**) {}");
    assert_eq!(
        html,
        "<pre><code class=\"language-javascript\" data-language=\"javascript\">\
         if (a &lt; b &amp;&amp; **c**) {}</code></pre>"
    );
}

#[test]
fn language_aliases_are_normalized() {
    assert_eq!(normalize_language("py"), "python");
    assert_eq!(normalize_language("C++"), "cpp");
    assert_eq!(normalize_language("c#"), "csharp");
    assert_eq!(normalize_language("bash"), "shell");
    assert_eq!(normalize_language("Haskell"), "haskell");
    assert_eq!(normalize_language(""), "text");
}

#[test]
fn fence_tags_keep_symbols() {
    assert_eq!(
        segment("```c#\nvar x = 1;\n```"),
        vec![code("c#", "var x = 1;")]
    );
    assert_eq!(
        segment("```f#\nlet x = 1\n```\n```c++\nint x;\n```"),
        vec![code("f#", "let x = 1"), code("c++", "int x;")]
    );
    assert!(render_html("```c#\nvar x = 1;\n```")
        .contains("<code class=\"language-csharp\" data-language=\"csharp\">var x = 1;</code>"));
}

#[test]
fn render_html_wraps_segments() {
    let html = render_html("Hi\n```ts\nlet a: number;\n```");
    assert_eq!(
        html,
        "<div class=\"text-content\">Hi<br></div>\
         <div class=\"code-block\"><div class=\"code-language\">ts</div>\
         <pre><code class=\"language-typescript\" data-language=\"typescript\">let a: number;</code></pre></div>"
    );
    assert_eq!(render_html(""), "");
}

#[test]
fn transcript_documents_escape_everything() {
    let at = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
    let messages = [
        Message::at(crate::core::message::TranscriptRole::User, "<hi>", at),
        Message::at(crate::core::message::TranscriptRole::Assistant, "**ok**", at),
    ];
    let doc = render_transcript_html(messages.iter(), "gpt<4o>");

    assert!(doc.starts_with("<!DOCTYPE html>"));
    assert!(doc.contains("Conversation with gpt&lt;4o&gt;"));
    assert!(doc.contains("&lt;hi&gt;"));
    assert!(doc.contains("<strong>ok</strong>"));
    assert!(doc.contains("2025-01-02 03:04:05 UTC"));
    assert!(!doc.contains("<hi>"));
}
