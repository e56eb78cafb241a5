//! Backend adapters behind one uniform interface.
//!
//! Each adapter owns its request shape, response decoding and error
//! classification; the router only ever sees [`Provider`].

pub mod openrouter;
pub mod pollinations;
pub mod prompt;
pub mod puter;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::core::attachment::{BinaryHandle, UploadedAttachment};
use crate::core::builtin_providers::{builtin_provider, ModelDescriptor, ProviderId};
use crate::core::chat_stream::DeltaStream;
use crate::core::error::ChatError;
use crate::core::message::Message;

pub use openrouter::OpenRouterProvider;
pub use pollinations::PollinationsProvider;
pub use puter::PuterProvider;

/// One user turn as handed to an adapter.
#[derive(Debug, Clone, Default)]
pub struct ChatTurn {
    pub model: String,
    pub message: String,
    pub attachments: Vec<UploadedAttachment>,
    /// Earlier conversation, oldest first, excluding `message` itself.
    pub history: Vec<Message>,
}

impl ChatTurn {
    pub fn new(model: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            message: message.into(),
            ..Default::default()
        }
    }
}

/// A reply is either available at once or arrives as a stream of deltas.
#[derive(Debug)]
pub enum ProviderReply {
    Complete(String),
    Stream(DeltaStream),
}

/// Where a generated image can be found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageReference {
    Url(String),
    Inline { mime_type: String, data: String },
}

impl ImageReference {
    /// A URI usable in `<img src>` or markdown image syntax.
    pub fn to_uri(&self) -> String {
        match self {
            ImageReference::Url(url) => url.clone(),
            ImageReference::Inline { mime_type, data } => format!("data:{mime_type};base64,{data}"),
        }
    }
}

/// Generation settings shared by the adapters.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestOptions {
    pub system_prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            system_prompt: prompt::DEFAULT_SYSTEM_PROMPT.to_string(),
            temperature: 0.7,
            max_tokens: 2000,
        }
    }
}

#[async_trait]
pub trait Provider: Send + Sync {
    fn id(&self) -> ProviderId;

    fn catalog(&self) -> &[ModelDescriptor] {
        &builtin_provider(self.id()).models
    }

    /// Descriptor for `model_id`, or the adapter's default model when the id
    /// is not in its catalog.
    fn model_config(&self, model_id: &str) -> ModelDescriptor {
        builtin_provider(self.id()).model_or_default(model_id).clone()
    }

    async fn send_message(
        &self,
        turn: &ChatTurn,
        cancel: CancellationToken,
    ) -> Result<ProviderReply, ChatError>;

    /// Whether [`Provider::analyze_image`] can succeed for multimodal models.
    fn supports_vision(&self) -> bool {
        false
    }

    async fn generate_image(&self, _prompt: &str) -> Result<ImageReference, ChatError> {
        Err(ChatError::unsupported(self.id().as_str(), "Image generation"))
    }

    async fn analyze_image(
        &self,
        _model_id: &str,
        _image: &BinaryHandle,
        _prompt: &str,
        _cancel: &CancellationToken,
    ) -> Result<String, ChatError> {
        Err(ChatError::unsupported(self.id().as_str(), "Image analysis"))
    }
}

/// Send a request unless the turn is cancelled first.
pub(crate) async fn send_with_cancel(
    provider: &'static str,
    request: reqwest::RequestBuilder,
    cancel: &CancellationToken,
) -> Result<reqwest::Response, ChatError> {
    tokio::select! {
        _ = cancel.cancelled() => {
            debug!("{provider} request cancelled before a response arrived");
            Err(ChatError::transport(provider, None, "request cancelled"))
        }
        result = request.send() => result.map_err(|err| ChatError::from_reqwest(provider, err)),
    }
}

/// Random value in `0..bound`, used for backend cache-busting seeds.
pub(crate) fn random_seed(bound: u32) -> u32 {
    let mut bytes = [0u8; 4];
    let raw = match getrandom::fill(&mut bytes) {
        Ok(()) => u32::from_le_bytes(bytes),
        Err(_) => chrono::Utc::now().timestamp_subsec_nanos(),
    };
    raw % bound.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_images_become_data_uris() {
        let image = ImageReference::Inline {
            mime_type: "image/png".into(),
            data: "AAAA".into(),
        };
        assert_eq!(image.to_uri(), "data:image/png;base64,AAAA");
        assert_eq!(ImageReference::Url("https://x/y".into()).to_uri(), "https://x/y");
    }

    #[test]
    fn seeds_stay_in_range() {
        for _ in 0..100 {
            assert!(random_seed(1000) < 1000);
        }
        assert_eq!(random_seed(0), 0);
    }
}
