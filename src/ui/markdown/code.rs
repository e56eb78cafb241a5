use super::escape_html;

/// Map a fence tag to the name highlighters expect.
pub fn normalize_language(tag: &str) -> String {
    let lower = tag.trim().to_ascii_lowercase();
    let mapped = match lower.as_str() {
        "js" | "jsx" => "javascript",
        "ts" | "tsx" => "typescript",
        "py" => "python",
        "c++" | "cpp" | "cc" => "cpp",
        "c#" | "cs" => "csharp",
        "rs" => "rust",
        "sh" | "bash" | "zsh" | "shell" => "shell",
        "md" => "markdown",
        "yml" => "yaml",
        "" => super::DEFAULT_CODE_LANGUAGE,
        _ => return lower,
    };
    mapped.to_string()
}

/// Render a code block verbatim; markdown inside code is never interpreted.
pub fn render_code(language: &str, source: &str) -> String {
    let lang = escape_html(&normalize_language(language));
    format!(
        "<pre><code class=\"language-{lang}\" data-language=\"{lang}\">{}</code></pre>",
        escape_html(source)
    )
}

/// Expand tabs to four spaces for terminal display.
pub(crate) fn detab(line: &str) -> String {
    line.replace('\t', "    ")
}
