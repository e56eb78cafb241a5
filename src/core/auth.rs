//! Authentication collaborator for the premium backend.
//!
//! The core only needs to know whether a signed-in identity exists; where the
//! token comes from (environment or system keyring) is decided here.

use async_trait::async_trait;
use keyring::Entry;
use std::sync::Mutex;
use tracing::{debug, info};

use crate::api::WhoAmI;
use crate::core::error::ChatError;
use crate::core::keyring::KeyringAccessError;
use crate::utils::url::construct_api_url;

pub const KEYRING_SERVICE: &str = "algocroc";
pub const PUTER_TOKEN_ENV: &str = "PUTER_AUTH_TOKEN";
pub const OPENROUTER_KEY_ENV: &str = "OPENROUTER_API_KEY";

const SIGN_IN_HINT: &str =
    "Please sign in to Puter to use premium models. Run 'algocroc auth puter' to store a token.";

#[derive(Clone, PartialEq, Eq)]
pub struct Identity {
    pub username: String,
    pub token: String,
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn sign_in(&self) -> Result<Identity, ChatError>;
    fn current_user(&self) -> Option<Identity>;
}

/// Stored secrets, keyed by provider id.
pub trait SecretStore: Send + Sync {
    fn get(&self, provider: &str) -> Result<Option<String>, KeyringAccessError>;
    fn set(&self, provider: &str, secret: &str) -> Result<(), KeyringAccessError>;
    fn delete(&self, provider: &str) -> Result<(), KeyringAccessError>;
}

/// Secrets kept in the platform keyring.
#[derive(Debug, Default, Clone)]
pub struct KeyringStore;

impl SecretStore for KeyringStore {
    fn get(&self, provider: &str) -> Result<Option<String>, KeyringAccessError> {
        let entry = Entry::new(KEYRING_SERVICE, provider)?;
        match entry.get_password() {
            Ok(secret) => Ok(Some(secret)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn set(&self, provider: &str, secret: &str) -> Result<(), KeyringAccessError> {
        Entry::new(KEYRING_SERVICE, provider)?.set_password(secret)?;
        Ok(())
    }

    fn delete(&self, provider: &str) -> Result<(), KeyringAccessError> {
        match Entry::new(KEYRING_SERVICE, provider)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// Environment variable first, then the secret store. Recoverable keyring
/// outages are treated as "no secret".
pub fn lookup_secret(
    store: &dyn SecretStore,
    env_var: &str,
    provider: &str,
) -> Result<Option<String>, KeyringAccessError> {
    if let Some(value) = std::env::var(env_var)
        .ok()
        .filter(|value| !value.trim().is_empty())
    {
        return Ok(Some(value.trim().to_string()));
    }
    match store.get(provider) {
        Ok(secret) => Ok(secret),
        Err(err) if err.is_recoverable() => {
            debug!("Keyring unavailable for {provider}: {err}");
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

/// Signs in to Puter with a stored token and verifies it against `/whoami`.
pub struct KeyringAuthenticator<S: SecretStore = KeyringStore> {
    client: reqwest::Client,
    base_url: String,
    store: S,
    current: Mutex<Option<Identity>>,
}

impl<S: SecretStore> KeyringAuthenticator<S> {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, store: S) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            store,
            current: Mutex::new(None),
        }
    }

    fn remember(&self, identity: Option<Identity>) {
        if let Ok(mut current) = self.current.lock() {
            *current = identity;
        }
    }
}

#[async_trait]
impl<S: SecretStore> Authenticator for KeyringAuthenticator<S> {
    async fn sign_in(&self) -> Result<Identity, ChatError> {
        let token = lookup_secret(&self.store, PUTER_TOKEN_ENV, "puter")
            .map_err(|err| ChatError::auth("puter", format!("{SIGN_IN_HINT} ({err})")))?
            .ok_or_else(|| ChatError::auth("puter", SIGN_IN_HINT))?;

        let response = self
            .client
            .get(construct_api_url(&self.base_url, "whoami"))
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|err| ChatError::from_reqwest("puter", err))?;

        let status = response.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            self.remember(None);
            return Err(ChatError::auth(
                "puter",
                "The stored Puter token was rejected. Run 'algocroc auth puter' again.",
            ));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::transport("puter", Some(status.as_u16()), body));
        }

        let whoami = response
            .json::<WhoAmI>()
            .await
            .map_err(|err| ChatError::decode("whoami response", err.to_string()))?;
        info!("Signed in to Puter as {}", whoami.username);

        let identity = Identity {
            username: whoami.username,
            token,
        };
        self.remember(Some(identity.clone()));
        Ok(identity)
    }

    fn current_user(&self) -> Option<Identity> {
        self.current.lock().ok().and_then(|current| current.clone())
    }
}
