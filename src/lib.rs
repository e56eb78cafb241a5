//! AlgoCroc AI is a line-oriented terminal chat client that routes each
//! conversation across premium and free LLM backends.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns the conversation, the provider backends, routing with
//!   automatic fallback, and the chat session that ties them together.
//! - [`ui`] renders replies to the terminal and runs the interactive loop.
//! - [`commands`] parses slash commands typed inside the chat.
//! - [`auth`] stores and removes credentials for the `auth`/`deauth` subcommands.
//! - [`api`] defines the request and response payloads each backend speaks.
//!
//! The binary (`src/main.rs`) routes through [`crate::cli::main`].

pub mod api;
pub mod auth;
pub mod cli;
pub mod commands;
pub mod core;
pub mod ui;
pub mod utils;
