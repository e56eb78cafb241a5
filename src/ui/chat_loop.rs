//! Interactive chat loop
//!
//! Reads one line at a time, dispatches slash commands through
//! [`crate::commands`] and sends everything else to the session. Ctrl-C
//! cancels the reply in flight; at the prompt it ends the chat.

use std::error::Error;
use std::future::Future;
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::debug;

use crate::commands::{process_input, CommandResult};
use crate::core::attachment::format_file_size;
use crate::core::builtin_providers::builtin_provider;
use crate::core::session::{ChatSession, TurnOutcome};

const PROMPT: &str = "> ";

pub async fn run_chat(session: ChatSession) -> Result<(), Box<dyn Error>> {
    run_chat_with(&session, BufReader::new(tokio::io::stdin())).await
}

pub async fn run_chat_with<R>(session: &ChatSession, input: R) -> Result<(), Box<dyn Error>>
where
    R: AsyncBufRead + Unpin,
{
    let model = session.router().active_model();
    let provider = builtin_provider(session.router().state().active_provider);
    session.notice(&format!(
        "AlgoCroc AI: chatting with {} via {}. Type /help for commands.",
        model.display_name, provider.display_name
    ));

    let mut lines = input.lines();
    loop {
        print!("{PROMPT}");
        std::io::stdout().flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
        };
        let Some(line) = line else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        match process_input(session, &line) {
            CommandResult::Continue => {}
            CommandResult::Quit => break,
            CommandResult::ProcessAsMessage(text) => {
                run_cancellable(session, session.send_message(&text)).await;
            }
            CommandResult::Attach(path) => match session.attach(&path).await {
                Ok(attachment) => session.notice(&format!(
                    "Attached {} ({}, {})",
                    attachment.name,
                    attachment.mime_type,
                    format_file_size(attachment.size)
                )),
                Err(err) => session.notice(&format!("Could not attach {}: {err}", path.display())),
            },
            CommandResult::Analyze { name, prompt } => {
                run_cancellable(session, session.analyze_attachment(&name, &prompt)).await;
            }
            CommandResult::GenerateImage(prompt) => {
                run_cancellable(session, session.generate_image(&prompt)).await;
            }
            CommandResult::SignIn => {
                if let Err(err) = session.sign_in().await {
                    session.notice(&format!("Sign-in failed: {err}"));
                }
            }
        }
    }
    Ok(())
}

/// Drive `turn` to completion, cancelling it on Ctrl-C. Turns without a
/// cancellation token are dropped instead, which returns the session to idle.
async fn run_cancellable<F>(session: &ChatSession, turn: F) -> TurnOutcome
where
    F: Future<Output = TurnOutcome>,
{
    tokio::pin!(turn);
    loop {
        tokio::select! {
            outcome = &mut turn => {
                debug!("Turn finished: {outcome:?}");
                return outcome;
            }
            signal = tokio::signal::ctrl_c() => {
                if signal.is_err() {
                    return turn.await;
                }
                if !session.cancel_turn() {
                    session.notice("Request abandoned");
                    return TurnOutcome::Cancelled;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::attachment::LocalFiles;
    use crate::core::builtin_providers::ProviderId;
    use crate::core::message::TranscriptRole;
    use crate::core::providers::Provider;
    use crate::core::router::ProviderRouter;
    use crate::utils::logging::TranscriptLog;
    use crate::utils::test_utils::{RecordingRenderer, ScriptedProvider};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn session(providers: Vec<Arc<dyn Provider>>) -> (ChatSession, RecordingRenderer) {
        let router = ProviderRouter::new(providers, "openai").unwrap();
        let renderer = RecordingRenderer::default();
        let session = ChatSession::new(
            router,
            Arc::new(LocalFiles),
            Box::new(renderer.clone()),
            TranscriptLog::new(None).unwrap(),
        );
        (session, renderer)
    }

    #[tokio::test]
    async fn lines_are_sent_until_quit() {
        let free = Arc::new(ScriptedProvider::new(ProviderId::Pollinations));
        let premium = Arc::new(ScriptedProvider::new(ProviderId::Puter));
        premium.push_complete("premium answer");
        let (session, _) = session(vec![free.clone(), premium.clone()]);

        let script = "hello\n\n/model gpt-4o\nwho are you?\n/quit\nnever sent\n";
        run_chat_with(&session, script.as_bytes()).await.unwrap();

        let messages: Vec<(TranscriptRole, String)> = session
            .messages()
            .into_iter()
            .map(|m| (m.role, m.content))
            .collect();
        assert_eq!(messages.len(), 5);
        assert_eq!(messages[1], (TranscriptRole::Assistant, "echo: hello".to_string()));
        assert_eq!(messages[2].0, TranscriptRole::System);
        assert_eq!(
            messages[4],
            (TranscriptRole::Assistant, "premium answer".to_string())
        );
        assert_eq!(free.calls(), 1);
        assert_eq!(premium.calls(), 1);
    }

    #[tokio::test]
    async fn attachments_are_loaded_from_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.md");
        std::fs::write(&path, "# Notes").unwrap();
        let free = Arc::new(ScriptedProvider::new(ProviderId::Pollinations));
        let (session, renderer) = session(vec![free.clone()]);

        let script = format!(
            "/attach {}\n/attach {}\nsummarize\n",
            path.display(),
            dir.path().join("missing.txt").display()
        );
        run_chat_with(&session, script.as_bytes()).await.unwrap();

        assert_eq!(session.attachments().len(), 1);
        let notices = renderer.notices();
        assert!(notices[1].starts_with("Attached notes.md"));
        assert!(notices[2].starts_with("Could not attach"));
        let turn = free.last_turn().unwrap();
        assert_eq!(turn.attachments[0].text_content.as_deref(), Some("# Notes"));
    }

    #[tokio::test]
    async fn images_are_generated_by_command() {
        let free = Arc::new(ScriptedProvider::new(ProviderId::Pollinations));
        let (session, _) = session(vec![free]);

        run_chat_with(&session, "/image a red fox\n".as_bytes())
            .await
            .unwrap();

        let last = session.messages().pop().unwrap();
        assert!(last.content.starts_with("**Generated Image:** \"a red fox\""));
        assert!(last.content.contains("https://images.test/a red fox"));
    }
}
