//! Provider selection and the fallback policy.
//!
//! The router owns the [`ProviderState`] for one session. It never holds a
//! state borrow across an await point, so the session may query it while a
//! turn is in flight.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::core::attachment::BinaryHandle;
use crate::core::auth::{Authenticator, Identity};
use crate::core::builtin_providers::{builtin_provider, find_model_owner, ModelDescriptor, ProviderId};
use crate::core::error::ChatError;
use crate::core::providers::{ChatTurn, ImageReference, Provider, ProviderReply};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderState {
    pub active_provider: ProviderId,
    pub active_model: String,
    pub is_authenticated: bool,
    pub fallback_enabled: bool,
    /// Provider that was active before the most recent fallback.
    pub previous_provider: Option<ProviderId>,
}

/// Where premium failures are retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackTarget {
    pub provider: ProviderId,
    pub model: String,
}

impl Default for FallbackTarget {
    fn default() -> Self {
        let provider = builtin_provider(ProviderId::Pollinations);
        Self {
            provider: provider.id,
            model: provider.default_model.clone(),
        }
    }
}

/// Result of a model switch, with the notice to show the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSwitch {
    pub provider: ProviderId,
    pub model: ModelDescriptor,
    pub notice: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackNotice {
    pub from: ProviderId,
    pub to: ProviderId,
    pub model: String,
    pub message: String,
}

#[derive(Debug)]
pub struct RouteOutcome {
    pub reply: ProviderReply,
    /// Set when the reply came from the fallback provider.
    pub fallback: Option<FallbackNotice>,
}

pub fn switch_notice(model: &ModelDescriptor, provider: ProviderId) -> String {
    if builtin_provider(provider).is_free() {
        format!("Switched to {} - No login required!", model.display_name)
    } else {
        format!(
            "Switched to {} - Login required for premium models",
            model.display_name
        )
    }
}

pub struct ProviderRouter {
    providers: HashMap<ProviderId, Arc<dyn Provider>>,
    authenticator: Option<Arc<dyn Authenticator>>,
    fallback: FallbackTarget,
    image_provider: ProviderId,
    state: RefCell<ProviderState>,
}

impl ProviderRouter {
    /// Start on `initial_model`, which must be in the catalog of a
    /// registered provider.
    pub fn new(
        providers: Vec<Arc<dyn Provider>>,
        initial_model: &str,
    ) -> Result<Self, ChatError> {
        let providers: HashMap<ProviderId, Arc<dyn Provider>> =
            providers.into_iter().map(|p| (p.id(), p)).collect();
        let (provider, model) = resolve_model(&providers, initial_model)?;
        Ok(Self {
            providers,
            authenticator: None,
            fallback: FallbackTarget::default(),
            image_provider: ProviderId::Pollinations,
            state: RefCell::new(ProviderState {
                active_provider: provider,
                active_model: model.id,
                is_authenticated: false,
                fallback_enabled: true,
                previous_provider: None,
            }),
        })
    }

    pub fn with_authenticator(mut self, authenticator: Arc<dyn Authenticator>) -> Self {
        self.state.get_mut().is_authenticated = authenticator.current_user().is_some();
        self.authenticator = Some(authenticator);
        self
    }

    pub fn with_fallback(mut self, fallback: FallbackTarget) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn with_image_provider(mut self, provider: ProviderId) -> Self {
        self.image_provider = provider;
        self
    }

    pub fn set_fallback_enabled(&self, enabled: bool) {
        self.state.borrow_mut().fallback_enabled = enabled;
    }

    pub fn state(&self) -> ProviderState {
        self.state.borrow().clone()
    }

    pub fn active_model(&self) -> ModelDescriptor {
        let state = self.state.borrow();
        self.provider(state.active_provider)
            .map(|p| p.model_config(&state.active_model))
            .unwrap_or_else(|| builtin_provider(state.active_provider).model_or_default(&state.active_model).clone())
    }

    /// Every model the registered providers offer, free tiers first.
    pub fn available_models(&self) -> Vec<(ProviderId, ModelDescriptor)> {
        ProviderId::ALL
            .into_iter()
            .filter_map(|id| self.provider(id))
            .flat_map(|p| p.catalog().iter().map(move |m| (p.id(), m.clone())))
            .collect()
    }

    /// Track the sign-in state after a provider call. Adapters may sign in on
    /// their own, and an auth failure means any earlier session is gone.
    fn refresh_authentication(&self, failure: Option<&ChatError>) {
        let authenticated = match failure {
            Some(ChatError::AuthenticationRequired { .. }) => false,
            _ => match &self.authenticator {
                Some(authenticator) => authenticator.current_user().is_some(),
                None => return,
            },
        };
        let mut state = self.state.borrow_mut();
        if state.is_authenticated != authenticated {
            debug!("Authentication state is now {authenticated}");
            state.is_authenticated = authenticated;
        }
    }

    fn provider(&self, id: ProviderId) -> Option<&Arc<dyn Provider>> {
        self.providers.get(&id)
    }

    fn require_provider(&self, id: ProviderId) -> Result<Arc<dyn Provider>, ChatError> {
        self.provider(id)
            .cloned()
            .ok_or_else(|| ChatError::validation(format!("Provider {id} is not configured")))
    }

    /// Make `model_id` the active model.
    pub fn switch_model(&self, model_id: &str) -> Result<ModelSwitch, ChatError> {
        let (provider, model) = resolve_model(&self.providers, model_id)?;
        {
            let mut state = self.state.borrow_mut();
            state.active_provider = provider;
            state.active_model = model.id.clone();
        }
        info!("Switched to {provider} model {}", model.id);
        Ok(ModelSwitch {
            provider,
            notice: switch_notice(&model, provider),
            model,
        })
    }

    /// Send `turn` to the active provider, retrying once on the fallback
    /// provider when the failure is auth or quota related.
    pub async fn route(
        &self,
        mut turn: ChatTurn,
        cancel: CancellationToken,
    ) -> Result<RouteOutcome, ChatError> {
        let (active, fallback_enabled) = {
            let state = self.state.borrow();
            turn.model = state.active_model.clone();
            (state.active_provider, state.fallback_enabled)
        };
        let provider = self.require_provider(active)?;
        debug!("Routing turn to {active} ({})", turn.model);

        let result = provider.send_message(&turn, cancel.clone()).await;
        self.refresh_authentication(result.as_ref().err());
        let err = match result {
            Ok(reply) => {
                return Ok(RouteOutcome {
                    reply,
                    fallback: None,
                })
            }
            Err(err) => err,
        };

        if !fallback_enabled
            || !err.is_fallback_eligible()
            || self.fallback.provider == active
            || cancel.is_cancelled()
        {
            return Err(err);
        }
        let Some(fallback) = self.provider(self.fallback.provider).cloned() else {
            warn!("Fallback provider {} is not configured", self.fallback.provider);
            return Err(err);
        };

        warn!("{active} failed ({err}); falling back to {}", self.fallback.provider);
        turn.model = self.fallback.model.clone();
        let reply = fallback.send_message(&turn, cancel).await?;

        let model = fallback.model_config(&self.fallback.model);
        {
            let mut state = self.state.borrow_mut();
            state.previous_provider = Some(active);
            state.active_provider = fallback.id();
            state.active_model = model.id.clone();
        }
        let reason = match err {
            ChatError::AuthenticationRequired { .. } => "requires sign-in",
            _ => "limit reached",
        };
        let message = format!(
            "{} {reason}. Switched to {} (free) for this and later messages.",
            builtin_provider(active).display_name,
            model.display_name
        );
        Ok(RouteOutcome {
            reply,
            fallback: Some(FallbackNotice {
                from: active,
                to: fallback.id(),
                model: model.id,
                message,
            }),
        })
    }

    /// Generate an image with the configured image provider.
    pub async fn generate_image(&self, prompt: &str) -> Result<ImageReference, ChatError> {
        let provider = self.require_provider(self.image_provider)?;
        provider.generate_image(prompt).await
    }

    /// Analyse an image with the active provider and model.
    pub async fn analyze_image(
        &self,
        image: &BinaryHandle,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> Result<String, ChatError> {
        let (active, model) = {
            let state = self.state.borrow();
            (state.active_provider, state.active_model.clone())
        };
        let provider = self.require_provider(active)?;
        let result = provider.analyze_image(&model, image, prompt, cancel).await;
        self.refresh_authentication(result.as_ref().err());
        result
    }

    pub async fn sign_in(&self) -> Result<Identity, ChatError> {
        let authenticator = self
            .authenticator
            .clone()
            .ok_or_else(|| ChatError::validation("No authenticator is configured"))?;
        let result = authenticator.sign_in().await;
        self.state.borrow_mut().is_authenticated = result.is_ok();
        result
    }
}

fn resolve_model(
    providers: &HashMap<ProviderId, Arc<dyn Provider>>,
    model_id: &str,
) -> Result<(ProviderId, ModelDescriptor), ChatError> {
    let model_id = model_id.trim();
    let (provider, model) = find_model_owner(model_id)
        .ok_or_else(|| ChatError::validation(format!("Unknown model: {model_id}")))?;
    if !providers.contains_key(&provider) {
        return Err(ChatError::validation(format!(
            "Model {model_id} needs provider {provider}, which is not configured"
        )));
    }
    Ok((provider, model.clone()))
}
