//! Structured view of backend error payloads.

use serde_json::Value;

const MAX_BODY_EXCERPT: usize = 300;

/// Status, code and message pulled out of a failed response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiErrorInfo {
    pub status: Option<u16>,
    pub code: Option<String>,
    pub message: String,
}

impl ApiErrorInfo {
    /// Decode an error body. Non-JSON bodies are kept as a trimmed excerpt.
    pub fn from_body(status: Option<u16>, body: &str) -> Self {
        let trimmed = body.trim();
        if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
            if let Some(info) = Self::from_value(status, &value) {
                return info;
            }
        }

        let message = if trimmed.is_empty() {
            status
                .map(|s| format!("HTTP {s}"))
                .unwrap_or_else(|| "empty response".to_string())
        } else {
            excerpt(trimmed)
        };
        Self {
            status,
            code: None,
            message,
        }
    }

    /// Extract an error from a JSON value, if it carries one.
    pub fn from_value(status: Option<u16>, value: &Value) -> Option<Self> {
        let error = value.get("error")?;
        if error.is_null() {
            return None;
        }
        let code = error
            .get("code")
            .or_else(|| value.get("code"))
            .and_then(code_to_string);
        let message = extract_error_summary(value).unwrap_or_else(|| excerpt(&value.to_string()));
        Some(Self {
            status,
            code,
            message,
        })
    }

    pub fn code_is(&self, candidates: &[&str]) -> bool {
        self.code
            .as_deref()
            .is_some_and(|code| candidates.iter().any(|c| c.eq_ignore_ascii_case(code)))
    }
}

fn code_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Best human-readable summary of an error payload.
pub fn extract_error_summary(value: &Value) -> Option<String> {
    let summary = value
        .pointer("/error/message")
        .and_then(|v| v.as_str())
        .map(str::to_owned)
        .or_else(|| {
            value.get("error").and_then(|v| match v {
                Value::String(s) => Some(s.to_string()),
                _ => None,
            })
        })
        .or_else(|| {
            value
                .get("message")
                .and_then(|v| v.as_str().map(str::to_owned))
        });

    summary
        .map(|text| text.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|text| !text.is_empty())
}

/// Compatibility shim for backends that only signal quota problems in free
/// text. Backend error payloads are not formally specified upstream, so this
/// list may need adjusting when wording changes.
pub fn mentions_usage_limit(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    [
        "usage-limited-chat",
        "usage limit",
        "permission denied",
        "rate limit",
        "insufficient credits",
        "quota",
    ]
    .iter()
    .any(|signal| lower.contains(signal))
}

fn excerpt(text: &str) -> String {
    if text.chars().count() <= MAX_BODY_EXCERPT {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(MAX_BODY_EXCERPT).collect();
    cut.push('…');
    cut
}
