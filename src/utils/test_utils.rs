//! Shared helpers for unit tests: scripted providers, an in-memory secret
//! store and an environment guard.

use async_trait::async_trait;
use futures_util::StreamExt;
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, LazyLock, Mutex, MutexGuard};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::core::attachment::BinaryHandle;
use crate::core::builtin_providers::ProviderId;
use crate::core::chat_stream::DeltaStream;
use crate::core::error::ChatError;
use crate::core::auth::{Authenticator, Identity, SecretStore};
use crate::core::keyring::KeyringAccessError;
use crate::core::message::{Message, TranscriptRole};
use crate::core::session::Renderer;
use crate::core::providers::{ChatTurn, ImageReference, Provider, ProviderReply};

enum Scripted {
    Complete(String),
    Stream(Vec<Result<String, ChatError>>),
    Stalled(Vec<String>),
    Error(ChatError),
}

/// Provider that replays queued replies and records what it was asked.
pub struct ScriptedProvider {
    id: ProviderId,
    replies: Mutex<VecDeque<Scripted>>,
    turns: Mutex<Vec<ChatTurn>>,
    calls: AtomicUsize,
    gate: Option<Arc<Notify>>,
    analysis: Mutex<Option<Result<String, ChatError>>>,
}

impl ScriptedProvider {
    pub fn new(id: ProviderId) -> Self {
        Self {
            id,
            replies: Mutex::new(VecDeque::new()),
            turns: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            gate: None,
            analysis: Mutex::new(None),
        }
    }

    /// Hold every reply until `gate` is notified.
    pub fn gated(id: ProviderId, gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::new(id)
        }
    }

    pub fn push_complete(&self, text: &str) {
        self.push(Scripted::Complete(text.to_string()));
    }

    pub fn push_stream(&self, deltas: &[&str]) {
        self.push(Scripted::Stream(
            deltas.iter().map(|d| Ok(d.to_string())).collect(),
        ));
    }

    pub fn push_stream_items(&self, items: Vec<Result<String, ChatError>>) {
        self.push(Scripted::Stream(items));
    }

    /// Stream `deltas`, then wait forever for the next one.
    pub fn push_stalled_stream(&self, deltas: &[&str]) {
        self.push(Scripted::Stalled(
            deltas.iter().map(|d| d.to_string()).collect(),
        ));
    }

    pub fn push_error(&self, err: ChatError) {
        self.push(Scripted::Error(err));
    }

    pub fn set_analysis(&self, result: Result<String, ChatError>) {
        *self.analysis.lock().unwrap() = Some(result);
    }

    fn push(&self, reply: Scripted) {
        self.replies.lock().unwrap().push_back(reply);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen_models(&self) -> Vec<String> {
        self.turns
            .lock()
            .unwrap()
            .iter()
            .map(|t| t.model.clone())
            .collect()
    }

    pub fn last_turn(&self) -> Option<ChatTurn> {
        self.turns.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn id(&self) -> ProviderId {
        self.id
    }

    async fn send_message(
        &self,
        turn: &ChatTurn,
        cancel: CancellationToken,
    ) -> Result<ProviderReply, ChatError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.turns.lock().unwrap().push(turn.clone());
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        let next = self.replies.lock().unwrap().pop_front();
        match next {
            Some(Scripted::Complete(text)) => Ok(ProviderReply::Complete(text)),
            Some(Scripted::Stream(items)) => Ok(ProviderReply::Stream(DeltaStream::new(
                futures_util::stream::iter(items),
                cancel,
            ))),
            Some(Scripted::Stalled(deltas)) => Ok(ProviderReply::Stream(DeltaStream::new(
                futures_util::stream::iter(deltas.into_iter().map(Ok))
                    .chain(futures_util::stream::pending()),
                cancel,
            ))),
            Some(Scripted::Error(err)) => Err(err),
            None => Ok(ProviderReply::Complete(format!("echo: {}", turn.message))),
        }
    }

    async fn generate_image(&self, prompt: &str) -> Result<ImageReference, ChatError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(ImageReference::Url(format!("https://images.test/{prompt}")))
    }

    /// Only providers with a scripted analysis can see images.
    fn supports_vision(&self) -> bool {
        self.analysis.lock().unwrap().is_some()
    }

    async fn analyze_image(
        &self,
        _model_id: &str,
        _image: &BinaryHandle,
        _prompt: &str,
        cancel: &CancellationToken,
    ) -> Result<String, ChatError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if cancel.is_cancelled() {
            return Err(ChatError::transport(self.id.as_str(), None, "analysis cancelled"));
        }
        self.analysis
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Err(ChatError::unsupported(self.id.as_str(), "Image analysis")))
    }
}

/// Drain a reply into its full text.
pub async fn collect_reply(reply: ProviderReply) -> Result<String, ChatError> {
    match reply {
        ProviderReply::Complete(text) => Ok(text),
        ProviderReply::Stream(mut stream) => {
            let mut text = String::new();
            while let Some(delta) = stream.next().await {
                text.push_str(&delta?);
            }
            Ok(text)
        }
    }
}

/// Authenticator whose signed-in user is set directly by the test.
#[derive(Default)]
pub struct StaticAuthenticator {
    user: Mutex<Option<Identity>>,
}

impl StaticAuthenticator {
    pub fn signed_in(username: &str) -> Self {
        let auth = Self::default();
        auth.set_user(Some(username));
        auth
    }

    pub fn set_user(&self, username: Option<&str>) {
        *self.user.lock().unwrap() = username.map(|name| Identity {
            username: name.to_string(),
            token: format!("token-{name}"),
        });
    }
}

#[async_trait]
impl Authenticator for StaticAuthenticator {
    async fn sign_in(&self) -> Result<Identity, ChatError> {
        self.current_user()
            .ok_or_else(|| ChatError::auth("puter", "No credentials"))
    }

    fn current_user(&self) -> Option<Identity> {
        self.user.lock().unwrap().clone()
    }
}

/// Secret store kept in memory.
#[derive(Default)]
pub struct MemoryStore {
    secrets: Mutex<HashMap<String, String>>,
    unavailable: bool,
}

impl MemoryStore {
    pub fn with(provider: &str, secret: &str) -> Self {
        let store = Self::default();
        store
            .secrets
            .lock()
            .unwrap()
            .insert(provider.to_string(), secret.to_string());
        store
    }

    /// A store whose backend always reports a recoverable outage.
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    fn outage() -> KeyringAccessError {
        KeyringAccessError::from(keyring::Error::NoStorageAccess(Box::new(
            std::io::Error::other("locked"),
        )))
    }
}

impl SecretStore for MemoryStore {
    fn get(&self, provider: &str) -> Result<Option<String>, KeyringAccessError> {
        if self.unavailable {
            return Err(Self::outage());
        }
        Ok(self.secrets.lock().unwrap().get(provider).cloned())
    }

    fn set(&self, provider: &str, secret: &str) -> Result<(), KeyringAccessError> {
        if self.unavailable {
            return Err(Self::outage());
        }
        self.secrets
            .lock()
            .unwrap()
            .insert(provider.to_string(), secret.to_string());
        Ok(())
    }

    fn delete(&self, provider: &str) -> Result<(), KeyringAccessError> {
        self.secrets.lock().unwrap().remove(provider);
        Ok(())
    }
}

static ENV_LOCK: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

/// Serializes tests that touch process environment variables and restores
/// every variable it changed on drop.
pub struct TestEnvVarGuard {
    saved: Vec<(String, Option<String>)>,
    _lock: MutexGuard<'static, ()>,
}

impl TestEnvVarGuard {
    pub fn new() -> Self {
        Self {
            saved: Vec::new(),
            _lock: ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner()),
        }
    }

    fn remember(&mut self, key: &str) {
        if !self.saved.iter().any(|(k, _)| k == key) {
            self.saved.push((key.to_string(), std::env::var(key).ok()));
        }
    }

    pub fn set_var(&mut self, key: &str, value: &str) {
        self.remember(key);
        std::env::set_var(key, value);
    }

    pub fn remove_var(&mut self, key: &str) {
        self.remember(key);
        std::env::remove_var(key);
    }
}

impl Drop for TestEnvVarGuard {
    fn drop(&mut self) {
        for (key, value) in self.saved.drain(..).rev() {
            match value {
                Some(value) => std::env::set_var(&key, value),
                None => std::env::remove_var(&key),
            }
        }
    }
}

/// What a [`RecordingRenderer`] was told, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderEvent {
    Added(TranscriptRole, String),
    Started,
    Update(String),
    Finished(Option<String>),
    Notice(String),
}

/// Renderer that records every callback. Clones share the same record.
#[derive(Clone, Default)]
pub struct RecordingRenderer {
    events: Rc<RefCell<Vec<RenderEvent>>>,
}

impl RecordingRenderer {
    pub fn events(&self) -> Vec<RenderEvent> {
        self.events.borrow().clone()
    }

    pub fn notices(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                RenderEvent::Notice(text) => Some(text),
                _ => None,
            })
            .collect()
    }
}

impl Renderer for RecordingRenderer {
    fn message_added(&self, message: &Message) {
        self.events
            .borrow_mut()
            .push(RenderEvent::Added(message.role, message.content.clone()));
    }

    fn stream_started(&self) {
        self.events.borrow_mut().push(RenderEvent::Started);
    }

    fn streaming_update(&self, content: &str) {
        self.events
            .borrow_mut()
            .push(RenderEvent::Update(content.to_string()));
    }

    fn stream_finished(&self, committed: Option<&Message>) {
        self.events
            .borrow_mut()
            .push(RenderEvent::Finished(committed.map(|m| m.content.clone())));
    }

    fn notice(&self, text: &str) {
        self.events
            .borrow_mut()
            .push(RenderEvent::Notice(text.to_string()));
    }
}
