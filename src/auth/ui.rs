use ratatui::crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use ratatui::crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use std::fmt;
use std::io::{self, Write};

const MASKED_INPUT_PROMPT: &str = "Enter your token (input is hidden): ";
const INVALID_CHOICE_MSG: &str = "Invalid choice";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderMenuItem {
    pub id: String,
    pub display_name: String,
    pub configured: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuSelection {
    Provider(usize),
    Cancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationChoice {
    Yes,
    No,
}

#[derive(Debug, Clone)]
pub struct UiError {
    message: String,
}

impl UiError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for UiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for UiError {}

fn read_line(prompt: &str) -> Result<String, UiError> {
    print!("{prompt}");
    io::stdout()
        .flush()
        .map_err(|err| UiError::new(err.to_string()))?;
    let mut input = String::new();
    io::stdin()
        .read_line(&mut input)
        .map_err(|err| UiError::new(err.to_string()))?;
    Ok(input)
}

pub fn prompt_provider_menu(
    title: &str,
    providers: &[ProviderMenuItem],
) -> Result<MenuSelection, UiError> {
    println!("{title}");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!();

    for (index, provider) in providers.iter().enumerate() {
        let status = if provider.configured {
            "✓ configured"
        } else {
            "not configured"
        };
        println!(
            "  {}. {} ({}) - {}",
            index + 1,
            provider.display_name,
            provider.id,
            status
        );
    }
    println!("  {}. Cancel", providers.len() + 1);
    println!();

    let input = read_line(&format!("Select a provider (1-{}): ", providers.len() + 1))?;
    parse_provider_selection(&input, providers.len())
}

pub fn prompt_provider_token(display_name: &str) -> Result<String, UiError> {
    println!();
    println!("Selected provider: {display_name}");
    let token = prompt_masked_input()?;
    if token.is_empty() {
        return Err(UiError::new("Token cannot be empty"));
    }
    Ok(token)
}

pub fn prompt_confirmation(question: &str) -> Result<ConfirmationChoice, UiError> {
    let input = read_line(&format!("{question} (y/N): "))?;
    parse_confirmation(&input)
}

/// Read a secret without echoing it. Esc or Ctrl-C cancels.
pub fn prompt_masked_input() -> Result<String, UiError> {
    print!("{MASKED_INPUT_PROMPT}");
    io::stdout()
        .flush()
        .map_err(|err| UiError::new(err.to_string()))?;

    enable_raw_mode().map_err(|err| UiError::new(err.to_string()))?;
    let result = read_masked_keys();
    let restore = disable_raw_mode();
    println!();
    restore.map_err(|err| UiError::new(err.to_string()))?;
    result
}

fn read_masked_keys() -> Result<String, UiError> {
    let mut secret = String::new();
    loop {
        let Event::Key(key) = event::read().map_err(|err| UiError::new(err.to_string()))? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        match key.code {
            KeyCode::Enter => return Ok(secret.trim().to_string()),
            KeyCode::Esc => return Err(UiError::new("Cancelled")),
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                return Err(UiError::new("Cancelled"))
            }
            KeyCode::Backspace => {
                secret.pop();
            }
            KeyCode::Char(ch) => secret.push(ch),
            _ => {}
        }
    }
}

pub fn parse_confirmation(input: &str) -> Result<ConfirmationChoice, UiError> {
    match input.trim().to_lowercase().as_str() {
        "" | "n" | "no" => Ok(ConfirmationChoice::No),
        "y" | "yes" => Ok(ConfirmationChoice::Yes),
        _ => Err(UiError::new("Invalid confirmation response")),
    }
}

/// Parse a 1-based menu choice; the entry after the providers cancels.
pub fn parse_provider_selection(input: &str, provider_count: usize) -> Result<MenuSelection, UiError> {
    let choice: usize = input
        .trim()
        .parse()
        .map_err(|_| UiError::new(INVALID_CHOICE_MSG))?;
    match choice {
        0 => Err(UiError::new(INVALID_CHOICE_MSG)),
        n if n <= provider_count => Ok(MenuSelection::Provider(n - 1)),
        n if n == provider_count + 1 => Ok(MenuSelection::Cancel),
        _ => Err(UiError::new(INVALID_CHOICE_MSG)),
    }
}
