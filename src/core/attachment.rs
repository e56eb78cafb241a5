//! Files attached to a conversation.
//!
//! Text files are read once and their content kept; everything else is only
//! referenced through a [`BinaryHandle`] so the bytes stay on disk until an
//! adapter needs them.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::core::error::ChatError;

/// Opaque reference to binary content living outside the transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryHandle(PathBuf);

impl BinaryHandle {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedAttachment {
    pub name: String,
    pub size: u64,
    pub mime_type: String,
    pub text_content: Option<String>,
    pub binary_handle: Option<BinaryHandle>,
}

impl UploadedAttachment {
    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }
}

/// Name, size and type of a file, as reported by the file collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDescriptor {
    pub name: String,
    pub size: u64,
    pub mime_type: String,
}

impl FileDescriptor {
    /// Text files have their content inlined into prompts.
    pub fn is_text(&self) -> bool {
        if self.mime_type.starts_with("text/") {
            return true;
        }
        let lower = self.name.to_ascii_lowercase();
        TEXT_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
    }
}

const TEXT_EXTENSIONS: &[&str] = &[
    ".txt", ".md", ".js", ".html", ".css", ".json", ".rs", ".py", ".toml", ".csv",
];

#[async_trait]
pub trait FileSource: Send + Sync {
    async fn describe(&self, path: &Path) -> Result<FileDescriptor, ChatError>;
    async fn read_as_text(&self, path: &Path) -> Result<String, ChatError>;
    async fn read_bytes(&self, handle: &BinaryHandle) -> Result<Vec<u8>, ChatError>;
}

/// File collaborator backed by the local filesystem.
#[derive(Debug, Clone, Default)]
pub struct LocalFiles;

#[async_trait]
impl FileSource for LocalFiles {
    async fn describe(&self, path: &Path) -> Result<FileDescriptor, ChatError> {
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|err| ChatError::validation(format!("{}: {err}", path.display())))?;
        if !metadata.is_file() {
            return Err(ChatError::validation(format!(
                "{} is not a file",
                path.display()
            )));
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(FileDescriptor {
            mime_type: guess_mime_type(&name).to_string(),
            name,
            size: metadata.len(),
        })
    }

    async fn read_as_text(&self, path: &Path) -> Result<String, ChatError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|err| ChatError::decode(path.display().to_string(), err.to_string()))?;
        String::from_utf8(bytes).map_err(|_| {
            ChatError::decode(path.display().to_string(), "file is not valid UTF-8 text")
        })
    }

    async fn read_bytes(&self, handle: &BinaryHandle) -> Result<Vec<u8>, ChatError> {
        tokio::fs::read(handle.path())
            .await
            .map_err(|err| ChatError::decode(handle.path().display().to_string(), err.to_string()))
    }
}

/// Build an attachment from a path, reading text content when the file
/// looks like text.
pub async fn load_attachment(
    files: &dyn FileSource,
    path: &Path,
) -> Result<UploadedAttachment, ChatError> {
    let descriptor = files.describe(path).await?;
    let text_content = if descriptor.is_text() {
        Some(files.read_as_text(path).await?)
    } else {
        None
    };
    let binary_handle = text_content
        .is_none()
        .then(|| BinaryHandle::new(path.to_path_buf()));

    Ok(UploadedAttachment {
        name: descriptor.name,
        size: descriptor.size,
        mime_type: descriptor.mime_type,
        text_content,
        binary_handle,
    })
}

pub fn guess_mime_type(name: &str) -> &'static str {
    let extension = name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "txt" => "text/plain",
        "md" => "text/markdown",
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "csv" => "text/csv",
        "js" => "text/javascript",
        "json" => "application/json",
        "toml" => "application/toml",
        "rs" => "text/x-rust",
        "py" => "text/x-python",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}

/// Human-readable size, e.g. `1.5 KB`.
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rounded = (value * 100.0).round() / 100.0;
    format!("{rounded} {}", UNITS[unit])
}
