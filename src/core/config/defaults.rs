use crate::core::builtin_providers::{builtin_provider, find_model_owner, ProviderId};
use crate::core::config::data::Config;
use crate::core::error::ChatError;
use crate::core::providers::RequestOptions;
use crate::core::router::FallbackTarget;

/// Slot in `base_urls` for the Pollinations image endpoint, which is
/// separate from its text endpoint.
pub const POLLINATIONS_IMAGE_SLOT: &str = "pollinations-image";

impl Config {
    /// Model to start on: the configured default, or the first free
    /// provider's default model.
    pub fn startup_model(&self) -> String {
        self.default_model
            .clone()
            .unwrap_or_else(|| builtin_provider(ProviderId::Pollinations).default_model.clone())
    }

    pub fn fallback_enabled(&self) -> bool {
        self.fallback.unwrap_or(true)
    }

    /// Where premium failures are retried. A configured fallback model
    /// must belong to a free provider.
    pub fn fallback_target(&self) -> Result<FallbackTarget, ChatError> {
        let Some(model_id) = self.fallback_model.as_deref() else {
            return Ok(FallbackTarget::default());
        };
        let (provider, model) = find_model_owner(model_id)
            .ok_or_else(|| ChatError::validation(format!("Unknown fallback model: {model_id}")))?;
        if !builtin_provider(provider).is_free() {
            return Err(ChatError::validation(format!(
                "Fallback model {model_id} is not served by a free provider"
            )));
        }
        Ok(FallbackTarget {
            provider,
            model: model.id.clone(),
        })
    }

    pub fn image_provider_id(&self) -> Result<ProviderId, ChatError> {
        match self.image_provider.as_deref() {
            None => Ok(ProviderId::Pollinations),
            Some(name) => ProviderId::parse(name)
                .ok_or_else(|| ChatError::validation(format!("Unknown image provider: {name}"))),
        }
    }

    pub fn request_options(&self) -> RequestOptions {
        let defaults = RequestOptions::default();
        RequestOptions {
            system_prompt: self
                .system_prompt
                .clone()
                .unwrap_or(defaults.system_prompt),
            temperature: self.temperature.unwrap_or(defaults.temperature),
            max_tokens: self.max_tokens.unwrap_or(defaults.max_tokens),
        }
    }

    /// Text/chat endpoint for `provider`, honoring overrides.
    pub fn base_url(&self, provider: ProviderId) -> String {
        self.base_urls
            .get(provider.as_str())
            .cloned()
            .unwrap_or_else(|| builtin_provider(provider).base_url.clone())
    }

    pub fn pollinations_image_url(&self) -> String {
        self.base_urls
            .get(POLLINATIONS_IMAGE_SLOT)
            .cloned()
            .or_else(|| builtin_provider(ProviderId::Pollinations).image_url.clone())
            .unwrap_or_else(|| self.base_url(ProviderId::Pollinations))
    }
}
