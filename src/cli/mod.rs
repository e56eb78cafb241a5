//! Command-line interface parsing and handling
//!
//! This module handles parsing command-line arguments and executing the appropriate commands.

pub mod model_list;
pub mod say;
pub mod settings;
pub mod setup;

use std::error::Error;

use clap::{Parser, Subcommand};

use crate::auth::AuthManager;
use crate::cli::model_list::list_models;
use crate::cli::say::{run_image, run_say};
use crate::cli::settings::{apply_set, apply_unset, describe_all, SettingRegistry};
use crate::cli::setup::{build_session, SessionOptions};
use crate::core::config::data::{path_display, Config};
use crate::ui::chat_loop::run_chat;

#[derive(Parser)]
#[command(name = "algocroc")]
#[command(version)]
#[command(about = "Terminal chat across premium and free AI models with automatic fallback")]
#[command(
    long_about = "AlgoCroc AI is a line-oriented terminal chat client. Free models (Pollinations, \
OpenRouter free tier) work without an account; premium models (GPT-4o, Claude, DeepSeek) go \
through Puter and need a sign-in. When a premium model asks for a login or runs out of quota, \
the message is retried on a free model automatically.\n\n\
Authentication:\n\
  Use 'algocroc auth' to store a Puter token or OpenRouter key in your system keyring.\n\n\
Environment Variables:\n\
  PUTER_AUTH_TOKEN     Puter token (overrides the keyring)\n\
  OPENROUTER_API_KEY   OpenRouter key (overrides the keyring)\n\
  ALGOCROC_LOG         Diagnostic log filter, e.g. debug (default: warn)\n\n\
Commands inside the chat:\n\
  /help             Show all commands\n\
  /model <id>       Switch models\n\
  /attach <path>    Attach a file\n\
  /image <prompt>   Generate an image\n\
  /export [path]    Save the conversation as JSON or HTML\n\
  Ctrl+C            Cancel the current reply, or quit at the prompt"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Model to use for chat
    #[arg(short = 'm', long, global = true, value_name = "MODEL")]
    pub model: Option<String>,

    /// Enable logging to specified file
    #[arg(short = 'l', long, global = true)]
    pub log: Option<String>,

    /// Do not retry on a free model when a premium model fails
    #[arg(long, global = true)]
    pub no_fallback: bool,
}

impl Args {
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            model: self.model.clone(),
            log_file: self.log.clone(),
            no_fallback: self.no_fallback,
        }
    }
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Start the chat interface (default)
    Chat,
    /// Send one message and print the reply
    Say {
        /// The message to send
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        prompt: Vec<String>,
    },
    /// Generate one image and print its reference
    Image {
        /// What the image should show
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        prompt: Vec<String>,
    },
    /// List available models
    Models {
        /// Ask OpenRouter which free models it serves right now
        #[arg(long)]
        remote: bool,
    },
    /// Store a Puter token or OpenRouter key
    Auth {
        /// puter or openrouter; prompts when omitted
        provider: Option<String>,
    },
    /// Remove a stored credential
    Deauth {
        /// puter or openrouter; prompts when omitted
        provider: Option<String>,
    },
    /// Set configuration values, or list them when no key is given
    Set {
        /// Configuration key to set
        key: Option<String>,
        /// Value to set for the key
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        value: Vec<String>,
    },
    /// Unset configuration values
    Unset {
        /// Configuration key to unset
        key: String,
    },
}

pub fn main() -> Result<(), Box<dyn Error>> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?
        .block_on(async_main())
}

fn print_settings(registry: &SettingRegistry) -> Result<(), Box<dyn Error>> {
    let config = Config::load()?;
    println!("Current configuration ({}):", path_display(Config::config_path()));
    for line in describe_all(registry, &config) {
        println!("{line}");
    }
    Ok(())
}

async fn async_main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let options = args.session_options();

    match args.command.unwrap_or(Commands::Chat) {
        Commands::Chat => run_chat(build_session(&options)?).await,
        Commands::Say { prompt } => run_say(prompt, &options).await,
        Commands::Image { prompt } => run_image(prompt, &options).await,
        Commands::Models { remote } => list_models(remote).await,
        Commands::Auth { provider } => AuthManager::new().interactive_auth(provider),
        Commands::Deauth { provider } => AuthManager::new().interactive_deauth(provider),
        Commands::Set { key, value } => {
            let registry = SettingRegistry::new();
            let Some(key) = key else {
                return print_settings(&registry);
            };
            match apply_set(&registry, &key, &value) {
                Ok(message) => {
                    println!("{message}");
                    Ok(())
                }
                Err(err) => {
                    err.print();
                    std::process::exit(1);
                }
            }
        }
        Commands::Unset { key } => match apply_unset(&SettingRegistry::new(), &key) {
            Ok(message) => {
                println!("{message}");
                Ok(())
            }
            Err(err) => {
                err.print();
                std::process::exit(1);
            }
        },
    }
}
