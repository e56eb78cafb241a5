//! Setting handlers, one per shape of value.

use url::Url;

use super::{SettingError, SettingHandler};
use crate::core::builtin_providers::{builtin_provider, find_model_owner, ProviderId};
use crate::core::config::data::Config;

/// Parse a boolean value from user input.
///
/// Accepts: on/off, true/false, yes/no (case-insensitive).
pub fn parse_bool(input: &str) -> Option<bool> {
    match input.to_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Some(true),
        "off" | "false" | "no" | "0" => Some(false),
        _ => None,
    }
}

pub fn format_bool(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}

fn require_value(value: &str, hint: &'static str, example: &'static str) -> Result<(), SettingError> {
    if value.is_empty() {
        return Err(SettingError::MissingArgs { hint, example });
    }
    Ok(())
}

/// On/off settings.
pub struct BooleanHandler {
    pub key: &'static str,
    pub example: &'static str,
    pub default_value: bool,
    pub field: fn(&mut Config) -> &mut Option<bool>,
    pub get: fn(&Config) -> Option<bool>,
}

impl SettingHandler for BooleanHandler {
    fn key(&self) -> &'static str {
        self.key
    }

    fn set(&self, value: &str, config: &mut Config) -> Result<String, SettingError> {
        require_value(value, "Specify on or off", self.example)?;
        let parsed = parse_bool(value).ok_or_else(|| SettingError::InvalidBoolean(value.to_string()))?;
        *(self.field)(config) = Some(parsed);
        Ok(format!("✅ Set {} to: {}", self.key, format_bool(parsed)))
    }

    fn unset(&self, config: &mut Config) -> String {
        *(self.field)(config) = None;
        format!(
            "✅ Unset {} (will use default: {})",
            self.key,
            format_bool(self.default_value)
        )
    }

    fn format(&self, config: &Config) -> String {
        match (self.get)(config) {
            Some(value) => format_bool(value).to_string(),
            None => format!("{} (default)", format_bool(self.default_value)),
        }
    }
}

/// A model id from the built-in catalog, optionally restricted to free
/// providers.
pub struct ModelHandler {
    pub key: &'static str,
    pub example: &'static str,
    pub free_only: bool,
    pub field: fn(&mut Config) -> &mut Option<String>,
    pub get: fn(&Config) -> Option<&String>,
}

impl SettingHandler for ModelHandler {
    fn key(&self) -> &'static str {
        self.key
    }

    fn set(&self, value: &str, config: &mut Config) -> Result<String, SettingError> {
        require_value(value, "Specify a model id", self.example)?;
        let (provider, model) =
            find_model_owner(value).ok_or_else(|| SettingError::UnknownModel(value.to_string()))?;
        if self.free_only && !builtin_provider(provider).is_free() {
            return Err(SettingError::InvalidValue {
                key: self.key,
                reason: format!("{} requires a login; pick a free model", model.id),
            });
        }
        *(self.field)(config) = Some(model.id.clone());
        Ok(format!(
            "✅ Set {} to: {} ({})",
            self.key, model.id, model.display_name
        ))
    }

    fn unset(&self, config: &mut Config) -> String {
        *(self.field)(config) = None;
        format!("✅ Unset {}", self.key)
    }

    fn format(&self, config: &Config) -> String {
        (self.get)(config)
            .cloned()
            .unwrap_or_else(|| "(unset)".to_string())
    }
}

pub struct ImageProviderHandler;

impl SettingHandler for ImageProviderHandler {
    fn key(&self) -> &'static str {
        "image-provider"
    }

    fn set(&self, value: &str, config: &mut Config) -> Result<String, SettingError> {
        require_value(
            value,
            "Specify the provider that generates images",
            "algocroc set image-provider pollinations",
        )?;
        let provider = ProviderId::parse(value).ok_or_else(|| SettingError::InvalidValue {
            key: self.key(),
            reason: format!("unknown provider {value}"),
        })?;
        config.image_provider = Some(provider.as_str().to_string());
        Ok(format!("✅ Set image-provider to: {provider}"))
    }

    fn unset(&self, config: &mut Config) -> String {
        config.image_provider = None;
        "✅ Unset image-provider (will use default: pollinations)".to_string()
    }

    fn format(&self, config: &Config) -> String {
        config
            .image_provider
            .clone()
            .unwrap_or_else(|| "pollinations (default)".to_string())
    }
}

pub struct SystemPromptHandler;

impl SettingHandler for SystemPromptHandler {
    fn key(&self) -> &'static str {
        "system-prompt"
    }

    fn set(&self, value: &str, config: &mut Config) -> Result<String, SettingError> {
        require_value(
            value,
            "Specify the system prompt text",
            "algocroc set system-prompt You are a terse assistant.",
        )?;
        config.system_prompt = Some(value.to_string());
        Ok("✅ Set system-prompt".to_string())
    }

    fn unset(&self, config: &mut Config) -> String {
        config.system_prompt = None;
        "✅ Unset system-prompt (will use the built-in prompt)".to_string()
    }

    fn format(&self, config: &Config) -> String {
        match &config.system_prompt {
            Some(prompt) => prompt.clone(),
            None => "(built-in)".to_string(),
        }
    }
}

pub struct TemperatureHandler;

impl SettingHandler for TemperatureHandler {
    fn key(&self) -> &'static str {
        "temperature"
    }

    fn set(&self, value: &str, config: &mut Config) -> Result<String, SettingError> {
        require_value(value, "Specify a temperature", "algocroc set temperature 0.7")?;
        let parsed: f32 = value.parse().map_err(|_| SettingError::InvalidValue {
            key: self.key(),
            reason: format!("{value} is not a number"),
        })?;
        if !(0.0..=2.0).contains(&parsed) {
            return Err(SettingError::InvalidValue {
                key: self.key(),
                reason: "must be between 0 and 2".to_string(),
            });
        }
        config.temperature = Some(parsed);
        Ok(format!("✅ Set temperature to: {parsed}"))
    }

    fn unset(&self, config: &mut Config) -> String {
        config.temperature = None;
        "✅ Unset temperature".to_string()
    }

    fn format(&self, config: &Config) -> String {
        config.request_options().temperature.to_string()
    }
}

pub struct MaxTokensHandler;

impl SettingHandler for MaxTokensHandler {
    fn key(&self) -> &'static str {
        "max-tokens"
    }

    fn set(&self, value: &str, config: &mut Config) -> Result<String, SettingError> {
        require_value(value, "Specify a token limit", "algocroc set max-tokens 2000")?;
        let parsed: u32 = value
            .parse()
            .ok()
            .filter(|tokens| *tokens > 0)
            .ok_or_else(|| SettingError::InvalidValue {
                key: self.key(),
                reason: format!("{value} is not a positive whole number"),
            })?;
        config.max_tokens = Some(parsed);
        Ok(format!("✅ Set max-tokens to: {parsed}"))
    }

    fn unset(&self, config: &mut Config) -> String {
        config.max_tokens = None;
        "✅ Unset max-tokens".to_string()
    }

    fn format(&self, config: &Config) -> String {
        config.request_options().max_tokens.to_string()
    }
}

/// Override of one provider endpoint, stored under `slot` in `base_urls`.
pub struct BaseUrlHandler {
    pub key: &'static str,
    pub slot: &'static str,
    pub example: &'static str,
}

impl SettingHandler for BaseUrlHandler {
    fn key(&self) -> &'static str {
        self.key
    }

    fn set(&self, value: &str, config: &mut Config) -> Result<String, SettingError> {
        require_value(value, "Specify a base URL", self.example)?;
        let url = Url::parse(value).map_err(|err| SettingError::InvalidValue {
            key: self.key,
            reason: err.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(SettingError::InvalidValue {
                key: self.key,
                reason: "only http and https URLs are supported".to_string(),
            });
        }
        config.base_urls.insert(self.slot.to_string(), value.to_string());
        Ok(format!("✅ Set {} to: {value}", self.key))
    }

    fn unset(&self, config: &mut Config) -> String {
        config.base_urls.remove(self.slot);
        format!("✅ Unset {} (will use the built-in endpoint)", self.key)
    }

    fn format(&self, config: &Config) -> String {
        match config.base_urls.get(self.slot) {
            Some(url) => url.clone(),
            None => "(built-in)".to_string(),
        }
    }
}
