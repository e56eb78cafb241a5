//! The chat session: conversation log, the single in-flight turn, attachments
//! and the user-facing side of errors.
//!
//! A session is driven from one task. State lives in `Cell`/`RefCell` and no
//! borrow is held across an await, so read-only queries stay valid while a
//! turn is pending.

use futures_util::StreamExt;
use std::cell::{Cell, RefCell};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::core::attachment::{load_attachment, FileSource, UploadedAttachment};
use crate::core::auth::Identity;
use crate::core::chat_stream::DeltaStream;
use crate::core::conversation::ConversationLog;
use crate::core::error::{ChatError, ErrorKind};
use crate::core::export::{export_conversation, ExportFormat};
use crate::core::message::Message;
use crate::core::providers::prompt::HISTORY_WINDOW;
use crate::core::providers::{ChatTurn, ProviderReply};
use crate::core::router::{ModelSwitch, ProviderRouter};
use crate::utils::logging::TranscriptLog;

/// Where the session is in the current turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Idle,
    Sending,
    Streaming,
}

/// What became of a request to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// A reply (or analysis, or image) was appended to the log.
    Completed,
    /// The request failed; an error message was appended to the log.
    Failed(ErrorKind),
    /// Another turn is in flight; nothing was changed.
    Busy,
    /// Input was rejected before anything was sent.
    Rejected(String),
    /// The turn was cancelled; the partial reply was discarded.
    Cancelled,
}

/// Presentation side of the session. Every callback happens on the session's
/// task.
pub trait Renderer {
    fn message_added(&self, message: &Message);
    fn stream_started(&self) {}
    /// Called with the full reply so far after every delta.
    fn streaming_update(&self, content: &str);
    /// `None` when the stream failed or was cancelled.
    fn stream_finished(&self, committed: Option<&Message>);
    fn notice(&self, text: &str);
}

pub const USAGE_LIMIT_GUIDANCE: &str = "Usage Limit Reached: The current model has usage limitations.\n\n\
Solutions:\n\
• Switch to a free model (OpenAI, DeepSeek, etc.)\n\
• Wait a few minutes and try again\n\
• Use shorter messages to conserve usage";

pub const AUTHENTICATION_GUIDANCE: &str = "Authentication Required: Premium models require a Puter sign-in.\n\n\
Options:\n\
• Use free models (no login required)\n\
• Sign in to Puter for premium models (algocroc auth puter)\n\
• Visit https://puter.com to create a free account";

/// Message shown to the user for a failed turn.
pub fn error_guidance(err: &ChatError) -> String {
    match err.kind() {
        ErrorKind::UsageLimitExceeded => USAGE_LIMIT_GUIDANCE.to_string(),
        ErrorKind::AuthenticationRequired => AUTHENTICATION_GUIDANCE.to_string(),
        _ => format!("Failed to send message: {err}"),
    }
}

/// Returns the session to `Idle` however the turn ends, including when the
/// turn future is dropped.
struct TurnGuard<'a> {
    session: &'a ChatSession,
}

impl<'a> TurnGuard<'a> {
    fn begin(session: &'a ChatSession) -> Option<Self> {
        if session.state.get() != TurnState::Idle {
            return None;
        }
        session.state.set(TurnState::Sending);
        Some(Self { session })
    }
}

impl Drop for TurnGuard<'_> {
    fn drop(&mut self) {
        self.session.state.set(TurnState::Idle);
        self.session.cancel.borrow_mut().take();
    }
}

pub struct ChatSession {
    router: ProviderRouter,
    files: Arc<dyn FileSource>,
    renderer: Box<dyn Renderer>,
    log: RefCell<ConversationLog>,
    attachments: RefCell<Vec<UploadedAttachment>>,
    transcript: RefCell<TranscriptLog>,
    state: Cell<TurnState>,
    cancel: RefCell<Option<CancellationToken>>,
}

impl ChatSession {
    pub fn new(
        router: ProviderRouter,
        files: Arc<dyn FileSource>,
        renderer: Box<dyn Renderer>,
        transcript: TranscriptLog,
    ) -> Self {
        Self {
            router,
            files,
            renderer,
            log: RefCell::new(ConversationLog::new()),
            attachments: RefCell::new(Vec::new()),
            transcript: RefCell::new(transcript),
            state: Cell::new(TurnState::Idle),
            cancel: RefCell::new(None),
        }
    }

    pub fn router(&self) -> &ProviderRouter {
        &self.router
    }

    pub fn state(&self) -> TurnState {
        self.state.get()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.log.borrow().to_vec()
    }

    pub fn message_count(&self) -> usize {
        self.log.borrow().len()
    }

    /// Cancel the in-flight turn, if any.
    pub fn cancel_turn(&self) -> bool {
        match self.cancel.borrow().as_ref() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Show a transient line that is not part of the conversation.
    pub fn notice(&self, text: &str) {
        self.renderer.notice(text);
    }

    pub async fn sign_in(&self) -> Result<Identity, ChatError> {
        let identity = self.router.sign_in().await?;
        self.commit(Message::system(format!(
            "Signed in to Puter as {}",
            identity.username
        )));
        Ok(identity)
    }

    fn commit(&self, message: Message) {
        if let Err(err) = self.transcript.borrow().log_message(&message) {
            warn!("Could not write transcript: {err}");
        }
        self.renderer.message_added(&message);
        self.log.borrow_mut().push(message);
    }

    fn commit_error(&self, err: &ChatError) -> TurnOutcome {
        debug!("Turn failed: {err}");
        self.commit(Message::error(error_guidance(err)));
        TurnOutcome::Failed(err.kind())
    }

    /// Send one user message and wait for the whole reply.
    pub async fn send_message(&self, text: &str) -> TurnOutcome {
        let Some(_guard) = TurnGuard::begin(self) else {
            debug!("Ignoring message while a turn is in flight");
            return TurnOutcome::Busy;
        };

        let text = text.trim();
        if text.is_empty() {
            let reason = "Please enter a message".to_string();
            self.renderer.notice(&reason);
            return TurnOutcome::Rejected(reason);
        }

        let history = self.log.borrow().recent_conversation(HISTORY_WINDOW);
        self.commit(Message::user(text));
        let turn = ChatTurn {
            model: String::new(),
            message: text.to_string(),
            attachments: self.attachments.borrow().clone(),
            history,
        };

        let cancel = CancellationToken::new();
        *self.cancel.borrow_mut() = Some(cancel.clone());

        let result = self.router.route(turn, cancel.clone()).await;
        if cancel.is_cancelled() {
            self.renderer.notice("Request cancelled");
            return TurnOutcome::Cancelled;
        }
        let outcome = match result {
            Ok(outcome) => outcome,
            Err(err) => return self.commit_error(&err),
        };

        if let Some(fallback) = outcome.fallback {
            self.commit(Message::system(fallback.message));
        }

        match outcome.reply {
            ProviderReply::Complete(reply) => {
                self.commit(Message::assistant(reply));
                TurnOutcome::Completed
            }
            ProviderReply::Stream(stream) => self.drain_stream(stream).await,
        }
    }

    /// Show the reply as it grows and commit it once the stream ends.
    async fn drain_stream(&self, mut stream: DeltaStream) -> TurnOutcome {
        self.state.set(TurnState::Streaming);
        self.renderer.stream_started();

        let mut content = String::new();
        while let Some(item) = stream.next().await {
            match item {
                Ok(delta) => {
                    content.push_str(&delta);
                    self.renderer.streaming_update(&content);
                }
                Err(err) => {
                    self.renderer.stream_finished(None);
                    return self.commit_error(&err);
                }
            }
        }

        if stream.is_cancelled() {
            self.renderer.stream_finished(None);
            self.renderer.notice("Response cancelled");
            return TurnOutcome::Cancelled;
        }
        if content.trim().is_empty() {
            self.renderer.stream_finished(None);
            return self.commit_error(&ChatError::decode("streamed reply", "no content received"));
        }

        let message = Message::assistant(content);
        self.renderer.stream_finished(Some(&message));
        if let Err(err) = self.transcript.borrow().log_message(&message) {
            warn!("Could not write transcript: {err}");
        }
        self.log.borrow_mut().push(message);
        TurnOutcome::Completed
    }

    pub fn switch_model(&self, model_id: &str) -> Result<ModelSwitch, ChatError> {
        let switch = self.router.switch_model(model_id)?;
        self.commit(Message::system(switch.notice.clone()));
        Ok(switch)
    }

    /// Attach a file by path. An attachment with the same name is replaced.
    pub async fn attach(&self, path: &Path) -> Result<UploadedAttachment, ChatError> {
        let attachment = load_attachment(self.files.as_ref(), path).await?;
        let mut attachments = self.attachments.borrow_mut();
        attachments.retain(|a| a.name != attachment.name);
        attachments.push(attachment.clone());
        Ok(attachment)
    }

    pub fn detach(&self, name: &str) -> bool {
        let mut attachments = self.attachments.borrow_mut();
        let before = attachments.len();
        attachments.retain(|a| a.name != name);
        attachments.len() != before
    }

    pub fn attachments(&self) -> Vec<UploadedAttachment> {
        self.attachments.borrow().clone()
    }

    /// Analyse an attached image with the active model.
    pub async fn analyze_attachment(&self, name: &str, prompt: &str) -> TurnOutcome {
        let Some(_guard) = TurnGuard::begin(self) else {
            return TurnOutcome::Busy;
        };

        let attachment = self
            .attachments
            .borrow()
            .iter()
            .find(|a| a.name == name)
            .cloned();
        let Some((attachment, handle)) = attachment.and_then(|a| {
            let handle = a.binary_handle.clone().filter(|_| a.is_image())?;
            Some((a, handle))
        }) else {
            let reason = format!("No attached image named {name}");
            self.renderer.notice(&reason);
            return TurnOutcome::Rejected(reason);
        };

        let cancel = CancellationToken::new();
        *self.cancel.borrow_mut() = Some(cancel.clone());

        let result = self.router.analyze_image(&handle, prompt, &cancel).await;
        if cancel.is_cancelled() {
            self.renderer.notice("Request cancelled");
            return TurnOutcome::Cancelled;
        }
        match result {
            Ok(analysis) => {
                self.commit(Message::assistant(format!(
                    "**Image Analysis for \"{}\":**\n\n{analysis}",
                    attachment.name
                )));
                TurnOutcome::Completed
            }
            Err(err) => {
                self.commit(Message::error(format!("Failed to analyze image: {err}")));
                TurnOutcome::Failed(err.kind())
            }
        }
    }

    /// Generate an image and append it to the conversation.
    pub async fn generate_image(&self, prompt: &str) -> TurnOutcome {
        let Some(_guard) = TurnGuard::begin(self) else {
            return TurnOutcome::Busy;
        };

        let prompt = prompt.trim();
        if prompt.is_empty() {
            self.commit(Message::error("Please enter an image description"));
            return TurnOutcome::Rejected("Please enter an image description".to_string());
        }

        match self.router.generate_image(prompt).await {
            Ok(image) => {
                self.commit(Message::assistant(format!(
                    "**Generated Image:** \"{prompt}\"\n\n![{prompt}]({})",
                    image.to_uri()
                )));
                TurnOutcome::Completed
            }
            Err(err) => {
                self.commit(Message::error(format!("Failed to generate image: {err}")));
                TurnOutcome::Failed(err.kind())
            }
        }
    }

    /// Forget the conversation and all attachments.
    pub fn clear(&self) {
        self.log.borrow_mut().clear();
        self.attachments.borrow_mut().clear();
        let transcript = self.transcript.borrow();
        if transcript.is_active() {
            if let Err(err) = transcript.rewrite(std::iter::empty()) {
                warn!("Could not clear transcript: {err}");
            }
        }
    }

    /// Export the conversation as JSON, or HTML for `.html` paths.
    pub fn export(&self, path: &Path) -> Result<(), ChatError> {
        let messages = self.messages();
        let model = self.router.state().active_model;
        export_conversation(&messages, &model, path, ExportFormat::from_path(path))?;
        self.commit(Message::system(format!(
            "Chat exported to {}",
            path.display()
        )));
        Ok(())
    }

    pub fn set_log_file(&self, path: String) -> Result<String, Box<dyn std::error::Error>> {
        let status = self.transcript.borrow_mut().set_log_file(path)?;
        self.transcript.borrow().rewrite(self.log.borrow().iter())?;
        Ok(status)
    }

    pub fn toggle_logging(&self) -> Result<String, Box<dyn std::error::Error>> {
        self.transcript.borrow_mut().toggle_logging("Logging paused")
    }

    pub fn logging_status(&self) -> String {
        self.transcript.borrow().get_status_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::attachment::LocalFiles;
    use crate::core::builtin_providers::ProviderId;
    use crate::core::message::TranscriptRole;
    use crate::core::providers::Provider;
    use crate::utils::test_utils::{RecordingRenderer, RenderEvent as Event, ScriptedProvider};
    use futures_util::poll;
    use tempfile::TempDir;
    use tokio::sync::Notify;

    fn session_with(
        providers: Vec<Arc<dyn Provider>>,
        model: &str,
    ) -> (ChatSession, RecordingRenderer) {
        let renderer = RecordingRenderer::default();
        let router = ProviderRouter::new(providers, model).unwrap();
        let session = ChatSession::new(
            router,
            Arc::new(LocalFiles),
            Box::new(renderer.clone()),
            TranscriptLog::new(None).unwrap(),
        );
        (session, renderer)
    }

    fn free_session(provider: &Arc<ScriptedProvider>) -> (ChatSession, RecordingRenderer) {
        session_with(vec![provider.clone()], "openai")
    }

    #[tokio::test]
    async fn streamed_deltas_commit_one_message() {
        let provider = Arc::new(ScriptedProvider::new(ProviderId::Pollinations));
        provider.push_stream(&["Hel", "lo"]);
        let (session, renderer) = free_session(&provider);

        assert_eq!(session.send_message("hi").await, TurnOutcome::Completed);

        let messages = session.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].role, TranscriptRole::Assistant);
        assert_eq!(messages[1].content, "Hello");
        assert_eq!(
            renderer.events()[1..],
            [
                Event::Started,
                Event::Update("Hel".into()),
                Event::Update("Hello".into()),
                Event::Finished(Some("Hello".into())),
            ]
        );
        assert_eq!(session.state(), TurnState::Idle);
    }

    #[tokio::test]
    async fn sending_while_busy_is_a_no_op() {
        let gate = Arc::new(Notify::new());
        let provider = Arc::new(ScriptedProvider::gated(ProviderId::Pollinations, gate.clone()));
        provider.push_complete("first reply");
        let (session, _renderer) = free_session(&provider);

        let first = session.send_message("first");
        tokio::pin!(first);
        assert!(poll!(&mut first).is_pending());
        assert_eq!(session.state(), TurnState::Sending);
        let logged = session.message_count();

        assert_eq!(session.send_message("second").await, TurnOutcome::Busy);
        assert_eq!(session.message_count(), logged);
        assert_eq!(provider.calls(), 1);

        gate.notify_one();
        assert_eq!(first.await, TurnOutcome::Completed);
        assert_eq!(session.message_count(), 2);
        assert_eq!(session.state(), TurnState::Idle);
    }

    #[tokio::test]
    async fn history_excludes_the_current_message() {
        let provider = Arc::new(ScriptedProvider::new(ProviderId::Pollinations));
        let (session, _renderer) = free_session(&provider);

        session.send_message("one").await;
        session.send_message("two").await;

        let turn = provider.last_turn().unwrap();
        assert_eq!(turn.message, "two");
        let history: Vec<&str> = turn.history.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(history, vec!["one", "echo: one"]);
    }

    #[tokio::test]
    async fn failures_append_guidance() {
        let provider = Arc::new(ScriptedProvider::new(ProviderId::Pollinations));
        provider.push_error(ChatError::usage_limit("pollinations", "slow down"));
        provider.push_error(ChatError::transport("pollinations", Some(500), "boom"));
        let (session, _renderer) = free_session(&provider);

        assert_eq!(
            session.send_message("a").await,
            TurnOutcome::Failed(ErrorKind::UsageLimitExceeded)
        );
        session.send_message("b").await;

        let messages = session.messages();
        assert_eq!(messages[1].role, TranscriptRole::Error);
        assert!(messages[1].content.starts_with("Usage Limit Reached:"));
        assert_eq!(
            messages[3].content,
            "Failed to send message: pollinations: HTTP 500: boom"
        );
        assert_eq!(session.state(), TurnState::Idle);
    }

    #[tokio::test]
    async fn mid_stream_errors_are_not_committed_as_replies() {
        let provider = Arc::new(ScriptedProvider::new(ProviderId::Pollinations));
        provider.push_stream_items(vec![
            Ok("partial".into()),
            Err(ChatError::transport("pollinations", None, "connection reset")),
        ]);
        let (session, renderer) = free_session(&provider);

        let outcome = session.send_message("hi").await;
        assert_eq!(outcome, TurnOutcome::Failed(ErrorKind::Transport));
        let messages = session.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].role, TranscriptRole::Error);
        assert!(renderer.events().contains(&Event::Finished(None)));
    }

    #[tokio::test]
    async fn fallback_notice_precedes_the_reply() {
        let premium = Arc::new(ScriptedProvider::new(ProviderId::Puter));
        premium.push_error(ChatError::auth("puter", "sign in"));
        let free = Arc::new(ScriptedProvider::new(ProviderId::Pollinations));
        free.push_complete("free reply");
        let (session, _renderer) = session_with(vec![premium, free], "claude-sonnet-4");

        assert_eq!(session.send_message("hi").await, TurnOutcome::Completed);
        let roles: Vec<TranscriptRole> = session.messages().iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![TranscriptRole::User, TranscriptRole::System, TranscriptRole::Assistant]
        );
        assert_eq!(session.router().state().active_provider, ProviderId::Pollinations);
    }

    #[tokio::test]
    async fn empty_input_is_rejected_without_logging() {
        let provider = Arc::new(ScriptedProvider::new(ProviderId::Pollinations));
        let (session, _renderer) = free_session(&provider);

        assert!(matches!(
            session.send_message("   ").await,
            TurnOutcome::Rejected(_)
        ));
        assert_eq!(session.message_count(), 0);
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn switching_models_leaves_a_system_notice() {
        let premium = Arc::new(ScriptedProvider::new(ProviderId::Puter));
        let free = Arc::new(ScriptedProvider::new(ProviderId::Pollinations));
        let (session, _renderer) = session_with(vec![premium, free], "openai");

        session.switch_model("gpt-4o").unwrap();
        assert!(session.switch_model("bogus").is_err());

        let messages = session.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(
            messages[0].content,
            "Switched to GPT-4o - Login required for premium models"
        );
    }

    #[tokio::test]
    async fn images_are_generated_and_validated() {
        let provider = Arc::new(ScriptedProvider::new(ProviderId::Pollinations));
        let (session, _renderer) = free_session(&provider);

        assert!(matches!(
            session.generate_image(" ").await,
            TurnOutcome::Rejected(_)
        ));
        assert_eq!(session.generate_image("fox").await, TurnOutcome::Completed);

        let messages = session.messages();
        assert_eq!(messages[0].role, TranscriptRole::Error);
        assert_eq!(
            messages[1].content,
            "**Generated Image:** \"fox\"\n\n![fox](https://images.test/fox)"
        );
    }

    #[tokio::test]
    async fn attachments_are_sent_and_analyzed() {
        let dir = TempDir::new().unwrap();
        let notes = dir.path().join("notes.md");
        std::fs::write(&notes, "remember").unwrap();
        let photo = dir.path().join("cat.png");
        std::fs::write(&photo, [0x89, b'P', b'N', b'G']).unwrap();

        let provider = Arc::new(ScriptedProvider::new(ProviderId::Pollinations));
        provider.set_analysis(Ok("a cat".into()));
        let (session, _renderer) = free_session(&provider);

        session.attach(&notes).await.unwrap();
        session.attach(&photo).await.unwrap();
        session.attach(&notes).await.unwrap();
        assert_eq!(session.attachments().len(), 2);

        session.send_message("read this").await;
        assert_eq!(provider.last_turn().unwrap().attachments.len(), 2);

        assert_eq!(
            session.analyze_attachment("cat.png", "").await,
            TurnOutcome::Completed
        );
        assert_eq!(
            session.messages().last().unwrap().content,
            "**Image Analysis for \"cat.png\":**\n\na cat"
        );
        assert!(matches!(
            session.analyze_attachment("notes.md", "").await,
            TurnOutcome::Rejected(_)
        ));

        assert!(session.detach("notes.md"));
        assert!(!session.detach("notes.md"));
        session.clear();
        assert!(session.attachments().is_empty());
        assert_eq!(session.message_count(), 0);
    }

    #[tokio::test]
    async fn export_rejects_empty_logs_and_writes_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("chat.json");
        let provider = Arc::new(ScriptedProvider::new(ProviderId::Pollinations));
        let (session, _renderer) = free_session(&provider);

        assert_eq!(
            session.export(&path).unwrap_err().kind(),
            ErrorKind::Validation
        );
        session.send_message("hello").await;
        session.export(&path).unwrap();

        let exported: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(exported["messageCount"], 2);
        assert_eq!(exported["model"], "openai");
    }

    #[tokio::test]
    async fn cancelled_streams_are_discarded() {
        let provider = Arc::new(ScriptedProvider::new(ProviderId::Pollinations));
        provider.push_stalled_stream(&["partial"]);
        let (session, renderer) = free_session(&provider);

        let turn = session.send_message("hi");
        tokio::pin!(turn);
        assert!(poll!(&mut turn).is_pending());
        assert_eq!(session.state(), TurnState::Streaming);
        assert!(session.cancel_turn());

        assert_eq!(turn.await, TurnOutcome::Cancelled);
        assert_eq!(session.message_count(), 1);
        let events = renderer.events();
        assert!(events.contains(&Event::Update("partial".into())));
        assert!(events.contains(&Event::Finished(None)));
        assert!(events.contains(&Event::Notice("Response cancelled".into())));
        assert!(!session.cancel_turn());
        assert_eq!(session.state(), TurnState::Idle);
    }

    #[tokio::test]
    async fn replies_arriving_after_cancel_are_not_committed() {
        let gate = Arc::new(Notify::new());
        let provider = Arc::new(ScriptedProvider::gated(ProviderId::Pollinations, gate.clone()));
        provider.push_complete("too late");
        let (session, renderer) = free_session(&provider);

        let turn = session.send_message("hi");
        tokio::pin!(turn);
        assert!(poll!(&mut turn).is_pending());
        assert!(session.cancel_turn());

        gate.notify_one();
        assert_eq!(turn.await, TurnOutcome::Cancelled);
        let messages = session.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, TranscriptRole::User);
        assert!(renderer
            .events()
            .contains(&Event::Notice("Request cancelled".into())));
        assert_eq!(session.state(), TurnState::Idle);
    }

    #[tokio::test]
    async fn image_analysis_can_be_cancelled() {
        let dir = TempDir::new().unwrap();
        let photo = dir.path().join("cat.png");
        std::fs::write(&photo, [0x89, b'P', b'N', b'G']).unwrap();

        let gate = Arc::new(Notify::new());
        let provider = Arc::new(ScriptedProvider::gated(ProviderId::Pollinations, gate.clone()));
        provider.set_analysis(Ok("a cat".into()));
        let (session, _renderer) = free_session(&provider);
        session.attach(&photo).await.unwrap();

        let analysis = session.analyze_attachment("cat.png", "");
        tokio::pin!(analysis);
        assert!(poll!(&mut analysis).is_pending());
        assert!(session.cancel_turn());

        gate.notify_one();
        assert_eq!(analysis.await, TurnOutcome::Cancelled);
        assert_eq!(session.message_count(), 0);
        assert_eq!(session.state(), TurnState::Idle);
    }
}
