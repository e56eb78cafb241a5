//! Terminal presentation for interactive chat sessions.
//!
//! - [`chat_loop`]: reads lines, dispatches them to [`crate::commands`] and
//!   drives [`crate::core::session`] turns with Ctrl-C cancellation.
//! - [`renderer`]: prints transcript entries and streamed replies.
//! - [`markdown`]: splits replies into prose and fenced code blocks.

pub mod chat_loop;
pub mod markdown;
pub mod renderer;
