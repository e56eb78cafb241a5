//! Pollinations: keyless text completions and URL-addressed image generation.
//! This is the designated fallback backend.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::api::errors::{mentions_usage_limit, ApiErrorInfo};
use crate::api::PollinationsRequest;
use crate::core::builtin_providers::ProviderId;
use crate::core::error::ChatError;
use crate::utils::url::image_prompt_url;

use super::prompt::{self, ComposedMessage};
use super::{
    random_seed, send_with_cancel, ChatTurn, ImageReference, Provider, ProviderReply,
    RequestOptions,
};

const NAME: &str = "pollinations";

pub fn classify(info: ApiErrorInfo) -> ChatError {
    match info.status {
        Some(402) | Some(429) => ChatError::usage_limit(NAME, info.message),
        Some(401) | Some(403) => ChatError::auth(NAME, info.message),
        _ if mentions_usage_limit(&info.message) => ChatError::usage_limit(NAME, info.message),
        status => ChatError::transport(NAME, status, info.message),
    }
}

pub struct PollinationsProvider {
    client: reqwest::Client,
    text_url: String,
    image_url: String,
    options: RequestOptions,
}

impl PollinationsProvider {
    pub fn new(
        client: reqwest::Client,
        text_url: impl Into<String>,
        image_url: impl Into<String>,
        options: RequestOptions,
    ) -> Self {
        Self {
            client,
            text_url: text_url.into(),
            image_url: image_url.into(),
            options,
        }
    }

    /// Image URL for `prompt` with a fixed seed.
    pub fn image_url_for(&self, prompt: &str, seed: u32) -> Result<String, ChatError> {
        image_prompt_url(&self.image_url, prompt, seed)
            .map_err(|err| ChatError::validation(format!("invalid image base URL: {err}")))
    }
}

#[async_trait]
impl Provider for PollinationsProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Pollinations
    }

    async fn send_message(
        &self,
        turn: &ChatTurn,
        cancel: CancellationToken,
    ) -> Result<ProviderReply, ChatError> {
        let model = self.model_config(&turn.model);
        let content = match prompt::compose_user_message(self, turn, &model, &cancel).await {
            ComposedMessage::Analyzed(analysis) => return Ok(ProviderReply::Complete(analysis)),
            ComposedMessage::Text(text) => text,
        };

        let body = PollinationsRequest {
            messages: prompt::build_messages(&self.options.system_prompt, &turn.history, &content),
            model: model.id.clone(),
            seed: random_seed(1000),
        };
        debug!("Sending {} messages to Pollinations model {}", body.messages.len(), body.model);

        let request = self.client.post(self.text_url.as_str()).json(&body);
        let response = send_with_cancel(NAME, request, &cancel).await?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|err| ChatError::from_reqwest(NAME, err))?;
        if !status.is_success() {
            return Err(classify(ApiErrorInfo::from_body(Some(status.as_u16()), &text)));
        }

        let reply = text.trim();
        if reply.is_empty() {
            return Err(ChatError::decode("Pollinations response", "empty reply"));
        }
        Ok(ProviderReply::Complete(reply.to_string()))
    }

    async fn generate_image(&self, prompt: &str) -> Result<ImageReference, ChatError> {
        self.image_url_for(prompt, random_seed(1_000_000))
            .map(ImageReference::Url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorKind;

    fn provider() -> PollinationsProvider {
        PollinationsProvider::new(
            reqwest::Client::new(),
            "https://text.pollinations.ai/",
            "https://image.pollinations.ai",
            RequestOptions::default(),
        )
    }

    #[test]
    fn rate_limits_are_usage_limits() {
        let err = classify(ApiErrorInfo::from_body(Some(429), "Too Many Requests"));
        assert_eq!(err.kind(), ErrorKind::UsageLimitExceeded);
        let err = classify(ApiErrorInfo::from_body(Some(500), "boom"));
        assert_eq!(err.kind(), ErrorKind::Transport);
    }

    #[tokio::test]
    async fn images_are_returned_as_urls() {
        let image = provider().generate_image("a cat").await.unwrap();
        let ImageReference::Url(url) = image else {
            panic!("expected a URL reference");
        };
        assert!(url.starts_with("https://image.pollinations.ai/prompt/a%20cat?seed="));
        assert!(url.ends_with("&nologo=true"));
    }

    #[tokio::test]
    async fn image_analysis_is_unsupported() {
        let handle = crate::core::attachment::BinaryHandle::new("/tmp/cat.png");
        let err = provider()
            .analyze_image("openai", &handle, "what is this", &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsupported);
    }

    #[test]
    fn unknown_models_fall_back_to_default() {
        assert_eq!(provider().model_config("nonexistent").id, "openai");
    }
}
