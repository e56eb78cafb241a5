//! Conversation export to JSON or a standalone HTML page.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::core::error::ChatError;
use crate::core::message::{Message, TranscriptRole};
use crate::ui::markdown::render_transcript_html;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Html,
}

impl ExportFormat {
    /// HTML for `.html`/`.htm` paths, JSON otherwise.
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("html") | Some("htm") => ExportFormat::Html,
            _ => ExportFormat::Json,
        }
    }
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ExportedConversation<'a> {
    pub timestamp: DateTime<Utc>,
    pub model: &'a str,
    pub message_count: usize,
    pub messages: Vec<ExportedMessage<'a>>,
}

#[derive(Serialize, Debug)]
pub struct ExportedMessage<'a> {
    #[serde(rename = "type")]
    pub kind: TranscriptRole,
    pub content: &'a str,
    pub timestamp: DateTime<Utc>,
}

/// `chat-export-YYYY-MM-DD.json` for the current day.
pub fn default_export_path(now: DateTime<Utc>) -> PathBuf {
    PathBuf::from(format!("chat-export-{}.json", now.format("%Y-%m-%d")))
}

pub fn conversation_json(messages: &[Message], model: &str, now: DateTime<Utc>) -> Result<String, ChatError> {
    let export = ExportedConversation {
        timestamp: now,
        model,
        message_count: messages.len(),
        messages: messages
            .iter()
            .map(|m| ExportedMessage {
                kind: m.role,
                content: &m.content,
                timestamp: m.timestamp,
            })
            .collect(),
    };
    serde_json::to_string_pretty(&export)
        .map_err(|err| ChatError::decode("conversation export", err.to_string()))
}

/// Write the conversation to `path`. Empty conversations are rejected.
pub fn export_conversation(
    messages: &[Message],
    model: &str,
    path: &Path,
    format: ExportFormat,
) -> Result<(), ChatError> {
    if messages.is_empty() {
        return Err(ChatError::validation("No messages to export"));
    }
    let contents = match format {
        ExportFormat::Json => conversation_json(messages, model, Utc::now())?,
        ExportFormat::Html => render_transcript_html(messages, model),
    };
    write_atomically(path, contents.as_bytes())
        .map_err(|err| ChatError::validation(format!("Could not write {}: {err}", path.display())))
}

fn write_atomically(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut temp_file = NamedTempFile::new_in(parent)?;
    temp_file.write_all(contents)?;
    temp_file.flush()?;
    temp_file.as_file().sync_all()?;
    temp_file.persist(path).map_err(|err| err.error)?;
    Ok(())
}
