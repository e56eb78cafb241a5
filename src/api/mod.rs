//! Request and response payloads for the supported backends.
//!
//! Each backend gets explicit types; responses are decoded into these at the
//! boundary rather than read field by field.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod errors;
pub mod models;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: MessageContent,
}

/// Message content: plain text, or a list of typed parts for vision calls.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ImageUrl {
    pub url: String,
}

impl ChatMessage {
    pub fn text(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: MessageContent::Text(content.into()),
        }
    }

    pub fn text_content(&self) -> Option<&str> {
        match &self.content {
            MessageContent::Text(text) => Some(text),
            MessageContent::Parts(_) => None,
        }
    }
}

/// OpenAI-compatible chat completion request (OpenRouter).
#[derive(Serialize, Debug)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
    pub frequency_penalty: f32,
    pub presence_penalty: f32,
}

#[derive(Deserialize, Debug)]
pub struct ChatResponseDelta {
    pub content: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct ChatStreamChoice {
    pub delta: ChatResponseDelta,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// One `data:` frame of an OpenAI-style SSE stream.
#[derive(Deserialize, Debug)]
pub struct ChatStreamChunk {
    #[serde(default)]
    pub choices: Vec<ChatStreamChoice>,
    #[serde(default)]
    pub error: Option<Value>,
}

#[derive(Deserialize, Debug)]
pub struct ChatCompletionMessage {
    pub content: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct ChatCompletionChoice {
    pub message: ChatCompletionMessage,
}

#[derive(Deserialize, Debug)]
pub struct ChatCompletion {
    #[serde(default)]
    pub choices: Vec<ChatCompletionChoice>,
}

/// Text completion request understood by the Pollinations text endpoint.
#[derive(Serialize, Debug)]
pub struct PollinationsRequest {
    pub messages: Vec<ChatMessage>,
    pub model: String,
    pub seed: u32,
}

/// Body of a Puter driver call.
#[derive(Serialize, Debug)]
pub struct DriverCall<A: Serialize> {
    pub interface: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver: Option<String>,
    pub method: &'static str,
    pub args: A,
}

#[derive(Serialize, Debug)]
pub struct DriverChatArgs {
    pub messages: Vec<ChatMessage>,
    pub model: String,
    pub stream: bool,
}

#[derive(Serialize, Debug)]
pub struct DriverImageArgs {
    pub prompt: String,
}

/// Envelope returned by Puter driver calls.
#[derive(Deserialize, Debug)]
pub struct DriverResponse {
    #[serde(default = "default_success")]
    pub success: bool,
    #[serde(default)]
    pub result: Option<DriverChatResult>,
    #[serde(default)]
    pub error: Option<Value>,
}

fn default_success() -> bool {
    true
}

#[derive(Deserialize, Debug)]
pub struct DriverChatResult {
    pub message: DriverResultMessage,
}

#[derive(Deserialize, Debug)]
pub struct DriverResultMessage {
    pub content: DriverResultContent,
}

#[derive(Deserialize, Debug)]
#[serde(untagged)]
pub enum DriverResultContent {
    Text(String),
    Parts(Vec<DriverTextPart>),
}

#[derive(Deserialize, Debug)]
pub struct DriverTextPart {
    #[serde(default)]
    pub text: String,
}

impl DriverResultContent {
    pub fn into_text(self) -> String {
        match self {
            DriverResultContent::Text(text) => text,
            DriverResultContent::Parts(parts) => parts
                .into_iter()
                .map(|p| p.text)
                .collect::<Vec<_>>()
                .join(""),
        }
    }
}

/// One JSON line of a streamed Puter chat completion.
#[derive(Deserialize, Debug)]
pub struct DriverStreamEvent {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub error: Option<Value>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct WhoAmI {
    pub username: String,
}
