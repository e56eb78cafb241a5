//! One-shot `say` and `image` commands

use std::error::Error;

use crate::cli::setup::{build_session, SessionOptions};
use crate::core::session::{ChatSession, TurnOutcome};

/// Turn the outcome of a one-shot request into the process result.
pub fn outcome_to_result(outcome: TurnOutcome) -> Result<(), Box<dyn Error>> {
    match outcome {
        TurnOutcome::Completed => Ok(()),
        TurnOutcome::Failed(kind) => Err(format!("Request failed ({kind:?})").into()),
        TurnOutcome::Rejected(reason) => Err(reason.into()),
        TurnOutcome::Cancelled => Err("Request cancelled".into()),
        TurnOutcome::Busy => Err("Another request is in flight".into()),
    }
}

async fn one_shot<F, Fut>(options: &SessionOptions, run: F) -> Result<(), Box<dyn Error>>
where
    F: FnOnce(ChatSession) -> Fut,
    Fut: std::future::Future<Output = TurnOutcome>,
{
    let session = build_session(options)?;
    outcome_to_result(run(session).await)
}

pub async fn run_say(prompt: Vec<String>, options: &SessionOptions) -> Result<(), Box<dyn Error>> {
    let prompt = prompt.join(" ");
    if prompt.trim().is_empty() {
        return Err("Usage: algocroc say <prompt>".into());
    }
    one_shot(options, |session| async move { session.send_message(&prompt).await }).await
}

pub async fn run_image(prompt: Vec<String>, options: &SessionOptions) -> Result<(), Box<dyn Error>> {
    let prompt = prompt.join(" ");
    if prompt.trim().is_empty() {
        return Err("Usage: algocroc image <description>".into());
    }
    one_shot(options, |session| async move { session.generate_image(&prompt).await }).await
}
