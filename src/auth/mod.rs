//! Credential setup for the `auth` and `deauth` subcommands.

pub mod ui;

use std::error::Error;
use tracing::debug;

use crate::auth::ui::{
    prompt_confirmation, prompt_provider_menu, prompt_provider_token, ConfirmationChoice,
    MenuSelection, ProviderMenuItem, UiError,
};
use crate::core::auth::{
    lookup_secret, KeyringStore, SecretStore, OPENROUTER_KEY_ENV, PUTER_TOKEN_ENV,
};
use crate::core::builtin_providers::{builtin_provider, ProviderId};
use crate::core::keyring::KeyringAccessError;

/// Providers that take a stored credential, with the env var that overrides
/// the keyring.
pub const CREDENTIAL_PROVIDERS: [(ProviderId, &str); 2] = [
    (ProviderId::Puter, PUTER_TOKEN_ENV),
    (ProviderId::OpenRouter, OPENROUTER_KEY_ENV),
];

fn map_ui_result<T>(result: Result<T, UiError>) -> Result<T, Box<dyn Error>> {
    result.map_err(|err| Box::new(err) as Box<dyn Error>)
}

pub struct AuthManager<S: SecretStore = KeyringStore> {
    store: S,
}

impl AuthManager<KeyringStore> {
    pub fn new() -> Self {
        Self::with_store(KeyringStore)
    }
}

impl Default for AuthManager<KeyringStore> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: SecretStore> AuthManager<S> {
    pub fn with_store(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Map a user-supplied name to a provider that accepts credentials.
    pub fn resolve_provider(name: &str) -> Result<ProviderId, Box<dyn Error>> {
        let provider = ProviderId::parse(name)
            .ok_or_else(|| format!("Unknown provider: {name}. Expected puter or openrouter."))?;
        if !CREDENTIAL_PROVIDERS.iter().any(|(id, _)| *id == provider) {
            return Err(format!("{provider} does not need credentials").into());
        }
        Ok(provider)
    }

    pub fn has_credential(&self, provider: ProviderId) -> Result<bool, KeyringAccessError> {
        let env_var = CREDENTIAL_PROVIDERS
            .iter()
            .find(|(id, _)| *id == provider)
            .map(|(_, env)| *env)
            .unwrap_or_default();
        Ok(lookup_secret(&self.store, env_var, provider.as_str())?.is_some())
    }

    pub fn menu_items(&self) -> Vec<ProviderMenuItem> {
        CREDENTIAL_PROVIDERS
            .iter()
            .map(|(id, _)| ProviderMenuItem {
                id: id.as_str().to_string(),
                display_name: builtin_provider(*id).display_name.clone(),
                configured: self.has_credential(*id).unwrap_or(false),
            })
            .collect()
    }

    pub fn store_token(&self, provider: ProviderId, token: &str) -> Result<(), Box<dyn Error>> {
        let token = token.trim();
        if token.is_empty() {
            return Err("Token cannot be empty".into());
        }
        self.store.set(provider.as_str(), token)?;
        debug!("Stored credential for {provider}");
        Ok(())
    }

    pub fn remove_token(&self, provider: ProviderId) -> Result<(), Box<dyn Error>> {
        self.store.delete(provider.as_str())?;
        debug!("Removed credential for {provider}");
        Ok(())
    }

    fn choose_provider(
        &self,
        title: &str,
        provider: Option<String>,
    ) -> Result<Option<ProviderId>, Box<dyn Error>> {
        if let Some(name) = provider {
            return Self::resolve_provider(&name).map(Some);
        }
        let items = self.menu_items();
        match map_ui_result(prompt_provider_menu(title, &items))? {
            MenuSelection::Provider(index) => Ok(Some(CREDENTIAL_PROVIDERS[index].0)),
            MenuSelection::Cancel => Ok(None),
        }
    }

    pub fn interactive_auth(&self, provider: Option<String>) -> Result<(), Box<dyn Error>> {
        let Some(provider) = self.choose_provider("🔐 AlgoCroc Authentication Setup", provider)?
        else {
            println!("Cancelled.");
            return Ok(());
        };
        let display_name = &builtin_provider(provider).display_name;
        let token = map_ui_result(prompt_provider_token(display_name))?;
        self.store_token(provider, &token)?;
        println!("✓ Token stored securely for {display_name}");
        Ok(())
    }

    pub fn interactive_deauth(&self, provider: Option<String>) -> Result<(), Box<dyn Error>> {
        let Some(provider) =
            self.choose_provider("🗑️  AlgoCroc Authentication Removal", provider)?
        else {
            println!("Cancelled.");
            return Ok(());
        };
        let display_name = &builtin_provider(provider).display_name;
        let question = format!("Remove the stored credential for {display_name}?");
        match map_ui_result(prompt_confirmation(&question))? {
            ConfirmationChoice::Yes => {
                self.remove_token(provider)?;
                println!("✅ Authentication removed for {display_name}");
            }
            ConfirmationChoice::No => println!("Cancelled."),
        }
        Ok(())
    }

    /// The OpenRouter key, if one is configured.
    pub fn openrouter_key(&self) -> Result<Option<String>, KeyringAccessError> {
        lookup_secret(&self.store, OPENROUTER_KEY_ENV, ProviderId::OpenRouter.as_str())
    }
}
