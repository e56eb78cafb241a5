pub mod attachment;
pub mod auth;
pub mod builtin_providers;
pub mod chat_stream;
pub mod config;
pub mod conversation;
pub mod error;
pub mod export;
pub mod keyring;
pub mod message;
pub mod providers;
pub mod router;
pub mod session;
