use super::CommandResult;
use crate::core::session::ChatSession;

pub type CommandHandler = fn(&ChatSession, CommandInvocation<'_>) -> CommandResult;

pub struct Command {
    pub name: &'static str,
    pub usage: &'static str,
    pub help: &'static str,
    pub handler: CommandHandler,
}

#[derive(Clone, Copy)]
pub struct CommandInvocation<'a> {
    pub input: &'a str,
    pub args: &'a str,
}

pub fn all_commands() -> &'static [Command] {
    COMMANDS
}

pub fn find_command(name: &str) -> Option<&'static Command> {
    all_commands()
        .iter()
        .find(|command| command.name.eq_ignore_ascii_case(name))
}

const COMMANDS: &[Command] = &[
    Command {
        name: "help",
        usage: "/help",
        help: "Show available commands.",
        handler: super::handle_help,
    },
    Command {
        name: "model",
        usage: "/model [id]",
        help: "Show the active model or switch to another one.",
        handler: super::handle_model,
    },
    Command {
        name: "models",
        usage: "/models",
        help: "List every model the configured providers offer.",
        handler: super::handle_models,
    },
    Command {
        name: "login",
        usage: "/login",
        help: "Sign in to Puter with the stored token.",
        handler: super::handle_login,
    },
    Command {
        name: "attach",
        usage: "/attach <path>",
        help: "Attach a file to the following messages.",
        handler: super::handle_attach,
    },
    Command {
        name: "detach",
        usage: "/detach <name>",
        help: "Remove an attached file.",
        handler: super::handle_detach,
    },
    Command {
        name: "files",
        usage: "/files",
        help: "List attached files.",
        handler: super::handle_files,
    },
    Command {
        name: "analyze",
        usage: "/analyze <name> [prompt]",
        help: "Describe an attached image with the active model.",
        handler: super::handle_analyze,
    },
    Command {
        name: "image",
        usage: "/image <description>",
        help: "Generate an image.",
        handler: super::handle_image,
    },
    Command {
        name: "clear",
        usage: "/clear",
        help: "Forget the conversation and attachments.",
        handler: super::handle_clear,
    },
    Command {
        name: "export",
        usage: "/export [path]",
        help: "Save the conversation as JSON, or HTML for .html paths.",
        handler: super::handle_export,
    },
    Command {
        name: "log",
        usage: "/log [file|status]",
        help: "Toggle transcript logging, set the log file, or show its status.",
        handler: super::handle_log,
    },
    Command {
        name: "quit",
        usage: "/quit",
        help: "Leave the chat.",
        handler: super::handle_quit,
    },
];
