//! Built-in provider and model catalog
//!
//! The catalog is embedded from `builtin_models.toml` at build time and
//! parsed once. Descriptors are read-only for the lifetime of the process.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::LazyLock;

/// The three backends the router can select between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    Puter,
    Pollinations,
    OpenRouter,
}

impl ProviderId {
    pub const ALL: [ProviderId; 3] = [
        ProviderId::Pollinations,
        ProviderId::OpenRouter,
        ProviderId::Puter,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ProviderId::Puter => "puter",
            ProviderId::Pollinations => "pollinations",
            ProviderId::OpenRouter => "openrouter",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|id| id.as_str().eq_ignore_ascii_case(value.trim()))
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Free,
    Premium,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub id: String,
    pub display_name: String,
    /// Vendor that trained the model, e.g. "DeepSeek".
    pub provider_name: String,
    #[serde(default)]
    pub capabilities: BTreeSet<String>,
    #[serde(default = "default_true", rename = "streaming")]
    pub supports_streaming: bool,
    #[serde(default, rename = "requires_auth")]
    pub requires_authentication: bool,
    #[serde(default)]
    pub multimodal: bool,
}

fn default_true() -> bool {
    true
}

impl ModelDescriptor {
    pub fn capabilities_label(&self) -> String {
        self.capabilities
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltinProvider {
    pub id: ProviderId,
    pub display_name: String,
    pub tier: Tier,
    pub base_url: String,
    pub image_url: Option<String>,
    pub default_model: String,
    pub models: Vec<ModelDescriptor>,
}

#[derive(Debug, Serialize, Deserialize)]
struct BuiltinProvidersConfig {
    providers: Vec<BuiltinProvider>,
}

impl BuiltinProvider {
    pub fn is_free(&self) -> bool {
        self.tier == Tier::Free
    }

    pub fn find_model(&self, model_id: &str) -> Option<&ModelDescriptor> {
        self.models.iter().find(|m| m.id == model_id)
    }

    /// Descriptor for `model_id`, or the provider's default model when the
    /// id is not in the catalog.
    pub fn model_or_default(&self, model_id: &str) -> &ModelDescriptor {
        self.find_model(model_id)
            .or_else(|| self.find_model(&self.default_model))
            .unwrap_or(&self.models[0])
    }
}

static BUILTIN_PROVIDERS: LazyLock<Vec<BuiltinProvider>> = LazyLock::new(|| {
    const CONFIG_CONTENT: &str = include_str!("../builtin_models.toml");

    let config: BuiltinProvidersConfig =
        toml::from_str(CONFIG_CONTENT).expect("Failed to parse builtin_models.toml");
    config.providers
});

/// All built-in providers in catalog order (free tiers first).
pub fn load_builtin_providers() -> &'static [BuiltinProvider] {
    &BUILTIN_PROVIDERS
}

pub fn builtin_provider(id: ProviderId) -> &'static BuiltinProvider {
    BUILTIN_PROVIDERS
        .iter()
        .find(|p| p.id == id)
        .expect("every ProviderId has a catalog entry")
}

/// Resolve the provider owning `model_id`: free catalogs first, then premium.
pub fn find_model_owner(model_id: &str) -> Option<(ProviderId, &'static ModelDescriptor)> {
    let providers = load_builtin_providers();
    providers
        .iter()
        .filter(|p| p.is_free())
        .chain(providers.iter().filter(|p| !p.is_free()))
        .find_map(|p| p.find_model(model_id).map(|m| (p.id, m)))
}
