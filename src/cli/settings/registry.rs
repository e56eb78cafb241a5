//! Registry of setting handlers.

use std::collections::HashMap;

use super::handlers::{
    BaseUrlHandler, BooleanHandler, ImageProviderHandler, MaxTokensHandler, ModelHandler,
    SystemPromptHandler, TemperatureHandler,
};
use super::SettingHandler;
use crate::core::config::defaults::POLLINATIONS_IMAGE_SLOT;

/// Registry of all available setting handlers.
pub struct SettingRegistry {
    handlers: HashMap<&'static str, Box<dyn SettingHandler>>,
    /// Keys in display order for `algocroc set` output.
    display_order: Vec<&'static str>,
}

impl SettingRegistry {
    /// Create a new registry with all handlers registered.
    pub fn new() -> Self {
        let mut registry = Self {
            handlers: HashMap::new(),
            display_order: Vec::new(),
        };

        registry.register(Box::new(ModelHandler {
            key: "default-model",
            example: "algocroc set default-model claude-sonnet-4",
            free_only: false,
            field: |config| &mut config.default_model,
            get: |config| config.default_model.as_ref(),
        }));
        registry.register(Box::new(BooleanHandler {
            key: "fallback",
            example: "algocroc set fallback off",
            default_value: true,
            field: |config| &mut config.fallback,
            get: |config| config.fallback,
        }));
        registry.register(Box::new(ModelHandler {
            key: "fallback-model",
            example: "algocroc set fallback-model deepseek/deepseek-r1:free",
            free_only: true,
            field: |config| &mut config.fallback_model,
            get: |config| config.fallback_model.as_ref(),
        }));
        registry.register(Box::new(ImageProviderHandler));
        registry.register(Box::new(SystemPromptHandler));
        registry.register(Box::new(TemperatureHandler));
        registry.register(Box::new(MaxTokensHandler));
        registry.register(Box::new(BaseUrlHandler {
            key: "puter-url",
            slot: "puter",
            example: "algocroc set puter-url https://api.puter.com",
        }));
        registry.register(Box::new(BaseUrlHandler {
            key: "pollinations-url",
            slot: "pollinations",
            example: "algocroc set pollinations-url https://text.pollinations.ai/",
        }));
        registry.register(Box::new(BaseUrlHandler {
            key: "pollinations-image-url",
            slot: POLLINATIONS_IMAGE_SLOT,
            example: "algocroc set pollinations-image-url https://image.pollinations.ai",
        }));
        registry.register(Box::new(BaseUrlHandler {
            key: "openrouter-url",
            slot: "openrouter",
            example: "algocroc set openrouter-url https://openrouter.ai/api/v1",
        }));

        registry
    }

    fn register(&mut self, handler: Box<dyn SettingHandler>) {
        let key = handler.key();
        self.display_order.push(key);
        self.handlers.insert(key, handler);
    }

    /// Get a handler by key.
    pub fn get(&self, key: &str) -> Option<&dyn SettingHandler> {
        self.handlers.get(key).map(|h| h.as_ref())
    }

    /// Get all keys in display order.
    pub fn keys_display_order(&self) -> &[&'static str] {
        &self.display_order
    }
}

impl Default for SettingRegistry {
    fn default() -> Self {
        Self::new()
    }
}
