//! Wiring a session from config, credentials and command-line flags.

use std::error::Error;
use std::io::IsTerminal;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::auth::AuthManager;
use crate::core::attachment::{FileSource, LocalFiles};
use crate::core::auth::{Authenticator, KeyringAuthenticator, KeyringStore, SecretStore};
use crate::core::builtin_providers::ProviderId;
use crate::core::config::data::Config;
use crate::core::providers::{OpenRouterProvider, PollinationsProvider, Provider, PuterProvider};
use crate::core::router::ProviderRouter;
use crate::core::session::ChatSession;
use crate::ui::renderer::TerminalRenderer;
use crate::utils::logging::TranscriptLog;

/// Flags shared by every subcommand that talks to a model.
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    pub model: Option<String>,
    pub log_file: Option<String>,
    pub no_fallback: bool,
}

pub fn http_client() -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .user_agent(concat!("algocroc/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Build the three adapters and a router over them.
pub fn build_router<S>(
    config: &Config,
    options: &SessionOptions,
    auth: &AuthManager<S>,
    client: reqwest::Client,
    authenticator: Arc<dyn Authenticator>,
) -> Result<ProviderRouter, Box<dyn Error>>
where
    S: SecretStore,
{
    let files: Arc<dyn FileSource> = Arc::new(LocalFiles);
    let request_options = config.request_options();

    let openrouter_key = auth.openrouter_key().unwrap_or_else(|err| {
        warn!("Could not read the OpenRouter key: {err}");
        None
    });
    if openrouter_key.is_none() {
        debug!("No OpenRouter key configured; OpenRouter models will ask for one");
    }

    let providers: Vec<Arc<dyn Provider>> = vec![
        Arc::new(PollinationsProvider::new(
            client.clone(),
            config.base_url(ProviderId::Pollinations),
            config.pollinations_image_url(),
            request_options.clone(),
        )),
        Arc::new(OpenRouterProvider::new(
            client.clone(),
            config.base_url(ProviderId::OpenRouter),
            openrouter_key,
            request_options.clone(),
        )),
        Arc::new(PuterProvider::new(
            client,
            config.base_url(ProviderId::Puter),
            authenticator.clone(),
            files,
            request_options,
        )),
    ];

    let model = options
        .model
        .clone()
        .filter(|model| !model.trim().is_empty())
        .unwrap_or_else(|| config.startup_model());

    let router = ProviderRouter::new(providers, &model)?
        .with_authenticator(authenticator)
        .with_fallback(config.fallback_target()?)
        .with_image_provider(config.image_provider_id()?);
    router.set_fallback_enabled(config.fallback_enabled() && !options.no_fallback);
    Ok(router)
}

/// A session printing to the terminal, backed by the keyring.
pub fn build_session(options: &SessionOptions) -> Result<ChatSession, Box<dyn Error>> {
    let config = Config::load()?;
    let client = http_client()?;
    let authenticator: Arc<dyn Authenticator> = Arc::new(KeyringAuthenticator::new(
        client.clone(),
        config.base_url(ProviderId::Puter),
        KeyringStore,
    ));
    let router = build_router(
        &config,
        options,
        &AuthManager::new(),
        client,
        authenticator,
    )?;
    let renderer = TerminalRenderer::new(std::io::stdout().is_terminal());
    let transcript = TranscriptLog::new(options.log_file.clone())?;
    Ok(ChatSession::new(
        router,
        Arc::new(LocalFiles),
        Box::new(renderer),
        transcript,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::auth::{OPENROUTER_KEY_ENV, PUTER_TOKEN_ENV};
    use crate::utils::test_utils::{MemoryStore, TestEnvVarGuard};

    fn router_for(config: &Config, options: &SessionOptions) -> Result<ProviderRouter, Box<dyn Error>> {
        let client = http_client().unwrap();
        let authenticator: Arc<dyn Authenticator> = Arc::new(KeyringAuthenticator::new(
            client.clone(),
            config.base_url(ProviderId::Puter),
            MemoryStore::default(),
        ));
        build_router(
            config,
            options,
            &AuthManager::with_store(MemoryStore::default()),
            client,
            authenticator,
        )
    }

    #[test]
    fn defaults_start_on_the_free_model_with_fallback() {
        let mut env = TestEnvVarGuard::new();
        env.remove_var(OPENROUTER_KEY_ENV);
        env.remove_var(PUTER_TOKEN_ENV);

        let router = router_for(&Config::default(), &SessionOptions::default()).unwrap();
        let state = router.state();
        assert_eq!(state.active_provider, ProviderId::Pollinations);
        assert_eq!(state.active_model, "openai");
        assert!(state.fallback_enabled);
        assert!(!state.is_authenticated);
        assert!(router.available_models().len() > 10);
    }

    #[test]
    fn flags_override_config() {
        let config = Config {
            default_model: Some("gpt-4o".to_string()),
            ..Default::default()
        };
        let options = SessionOptions {
            model: Some("claude-sonnet-4".to_string()),
            no_fallback: true,
            ..Default::default()
        };
        let state = router_for(&config, &options).unwrap().state();
        assert_eq!(state.active_provider, ProviderId::Puter);
        assert_eq!(state.active_model, "claude-sonnet-4");
        assert!(!state.fallback_enabled);
    }

    #[test]
    fn invalid_settings_are_reported() {
        let options = SessionOptions {
            model: Some("gpt-9".to_string()),
            ..Default::default()
        };
        let err = router_for(&Config::default(), &options).err().unwrap();
        assert_eq!(err.to_string(), "Unknown model: gpt-9");

        let config = Config {
            image_provider: Some("midjourney".to_string()),
            ..Default::default()
        };
        assert!(router_for(&config, &SessionOptions::default()).is_err());
    }
}
