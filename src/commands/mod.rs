//! Slash commands for the interactive chat.
//!
//! Synchronous commands run directly against the session. Commands that need
//! a request (attach, analyze, image, login) come back as a [`CommandResult`]
//! for the chat loop to await.

mod registry;

pub use registry::{all_commands, find_command, Command, CommandInvocation};

use chrono::Utc;
use std::path::PathBuf;

use crate::core::builtin_providers::builtin_provider;
use crate::core::export::default_export_path;
use crate::core::providers::prompt::DEFAULT_IMAGE_PROMPT;
use crate::core::session::ChatSession;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    Continue,
    ProcessAsMessage(String),
    Attach(PathBuf),
    Analyze { name: String, prompt: String },
    GenerateImage(String),
    SignIn,
    Quit,
}

pub fn process_input(session: &ChatSession, input: &str) -> CommandResult {
    let trimmed = input.trim();

    let Some(rest) = trimmed.strip_prefix('/') else {
        return CommandResult::ProcessAsMessage(input.to_string());
    };

    let mut parts = rest.splitn(2, char::is_whitespace);
    let command_name = match parts.next() {
        Some(name) if !name.is_empty() => name,
        _ => return CommandResult::ProcessAsMessage(input.to_string()),
    };
    let args = parts.next().unwrap_or("").trim();

    match registry::find_command(command_name) {
        Some(command) => (command.handler)(
            session,
            CommandInvocation {
                input: trimmed,
                args,
            },
        ),
        None => CommandResult::ProcessAsMessage(input.to_string()),
    }
}

pub fn help_text() -> String {
    let mut help = String::from("Commands:\n");
    for command in all_commands() {
        help.push_str(&format!("  {:<26} {}\n", command.usage, command.help));
    }
    help.push_str("Anything else is sent to the active model. Ctrl-C cancels a reply.");
    help
}

pub(super) fn handle_help(session: &ChatSession, _invocation: CommandInvocation<'_>) -> CommandResult {
    session.notice(&help_text());
    CommandResult::Continue
}

pub(super) fn handle_model(session: &ChatSession, invocation: CommandInvocation<'_>) -> CommandResult {
    if invocation.args.is_empty() {
        let state = session.router().state();
        let model = session.router().active_model();
        session.notice(&format!(
            "Current model: {} ({}) via {}",
            model.display_name,
            model.id,
            builtin_provider(state.active_provider).display_name
        ));
        return CommandResult::Continue;
    }
    if let Err(err) = session.switch_model(invocation.args) {
        session.notice(&err.to_string());
    }
    CommandResult::Continue
}

pub(super) fn handle_models(session: &ChatSession, _invocation: CommandInvocation<'_>) -> CommandResult {
    let active = session.router().state().active_model;
    let mut listing = String::from("Available models:");
    let mut last_provider = None;
    for (provider, model) in session.router().available_models() {
        if last_provider != Some(provider) {
            let entry = builtin_provider(provider);
            let tier = if entry.is_free() {
                "free"
            } else {
                "login required"
            };
            listing.push_str(&format!("\n{} ({tier})", entry.display_name));
            last_provider = Some(provider);
        }
        let marker = if model.id == active { "*" } else { " " };
        listing.push_str(&format!(
            "\n {marker} {:<44} {}",
            model.id, model.display_name
        ));
    }
    session.notice(&listing);
    CommandResult::Continue
}

pub(super) fn handle_login(_session: &ChatSession, _invocation: CommandInvocation<'_>) -> CommandResult {
    CommandResult::SignIn
}

pub(super) fn handle_attach(session: &ChatSession, invocation: CommandInvocation<'_>) -> CommandResult {
    if invocation.args.is_empty() {
        session.notice("Usage: /attach <path>");
        return CommandResult::Continue;
    }
    CommandResult::Attach(PathBuf::from(invocation.args))
}

pub(super) fn handle_detach(session: &ChatSession, invocation: CommandInvocation<'_>) -> CommandResult {
    if invocation.args.is_empty() {
        session.notice("Usage: /detach <name>");
    } else if session.detach(invocation.args) {
        session.notice(&format!("Detached {}", invocation.args));
    } else {
        session.notice(&format!("No attachment named {}", invocation.args));
    }
    CommandResult::Continue
}

pub(super) fn handle_files(session: &ChatSession, _invocation: CommandInvocation<'_>) -> CommandResult {
    let attachments = session.attachments();
    if attachments.is_empty() {
        session.notice("No files attached.");
        return CommandResult::Continue;
    }
    let mut listing = String::from("Attached files:");
    for attachment in attachments {
        listing.push_str(&format!(
            "\n  {} ({}, {})",
            attachment.name,
            attachment.mime_type,
            crate::core::attachment::format_file_size(attachment.size)
        ));
    }
    session.notice(&listing);
    CommandResult::Continue
}

pub(super) fn handle_analyze(session: &ChatSession, invocation: CommandInvocation<'_>) -> CommandResult {
    let mut parts = invocation.args.splitn(2, char::is_whitespace);
    let Some(name) = parts.next().filter(|name| !name.is_empty()) else {
        session.notice("Usage: /analyze <name> [prompt]");
        return CommandResult::Continue;
    };
    let prompt = parts
        .next()
        .map(str::trim)
        .filter(|prompt| !prompt.is_empty())
        .unwrap_or(DEFAULT_IMAGE_PROMPT);
    CommandResult::Analyze {
        name: name.to_string(),
        prompt: prompt.to_string(),
    }
}

pub(super) fn handle_image(_session: &ChatSession, invocation: CommandInvocation<'_>) -> CommandResult {
    CommandResult::GenerateImage(invocation.args.to_string())
}

pub(super) fn handle_clear(session: &ChatSession, _invocation: CommandInvocation<'_>) -> CommandResult {
    session.clear();
    session.notice("Conversation cleared.");
    CommandResult::Continue
}

pub(super) fn handle_export(session: &ChatSession, invocation: CommandInvocation<'_>) -> CommandResult {
    let path = if invocation.args.is_empty() {
        default_export_path(Utc::now())
    } else {
        PathBuf::from(invocation.args)
    };
    if let Err(err) = session.export(&path) {
        session.notice(&format!("Export failed: {err}"));
    }
    CommandResult::Continue
}

pub(super) fn handle_log(session: &ChatSession, invocation: CommandInvocation<'_>) -> CommandResult {
    if invocation.args.eq_ignore_ascii_case("status") {
        session.notice(&format!("Logging: {}", session.logging_status()));
        return CommandResult::Continue;
    }
    let result = if invocation.args.is_empty() {
        session.toggle_logging()
    } else {
        session.set_log_file(invocation.args.to_string())
    };
    match result {
        Ok(message) => session.notice(&message),
        Err(err) => session.notice(&format!("Log error: {err}")),
    }
    CommandResult::Continue
}

pub(super) fn handle_quit(_session: &ChatSession, _invocation: CommandInvocation<'_>) -> CommandResult {
    CommandResult::Quit
}
