//! Model listing functionality
//!
//! Lists the built-in catalog, or with `--remote` the free models OpenRouter
//! currently serves.

use chrono::{DateTime, Utc};
use std::error::Error;

use crate::api::models::{fetch_models, free_models, ModelInfo};
use crate::cli::setup::http_client;
use crate::core::builtin_providers::{load_builtin_providers, BuiltinProvider, ProviderId};
use crate::core::config::data::Config;

pub fn catalog_listing(providers: &[BuiltinProvider], default_model: &str) -> Vec<String> {
    let mut lines = Vec::new();
    for provider in providers {
        let tier = if provider.is_free() {
            "free, no login required"
        } else {
            "premium, login required"
        };
        lines.push(format!("{} ({tier})", provider.display_name));
        for model in &provider.models {
            let marker = if model.id == default_model { "*" } else { "•" };
            let mut line = format!("  {marker} {} - {}", model.id, model.display_name);
            let capabilities = model.capabilities_label();
            if !capabilities.is_empty() {
                line.push_str(&format!(" [{capabilities}]"));
            }
            lines.push(line);
        }
        lines.push(String::new());
    }
    lines
}

fn format_created(created: u64) -> Option<String> {
    // Some APIs report milliseconds.
    let secs = if created > 10_000_000_000 {
        created / 1000
    } else {
        created
    };
    DateTime::<Utc>::from_timestamp(secs as i64, 0).map(|dt| dt.format("%Y-%m-%d").to_string())
}

pub fn remote_listing(models: &[ModelInfo]) -> Vec<String> {
    models
        .iter()
        .map(|model| {
            let mut line = format!("  • {}", model.id);
            if let Some(name) = model.name.as_deref().filter(|name| *name != model.id) {
                line.push_str(&format!(" - {name}"));
            }
            if let Some(created) = model.created.and_then(format_created) {
                line.push_str(&format!(" ({created})"));
            }
            line
        })
        .collect()
}

pub async fn list_models(remote: bool) -> Result<(), Box<dyn Error>> {
    let config = Config::load()?;

    if !remote {
        println!("🤖 Available Models");
        println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        println!();
        for line in catalog_listing(load_builtin_providers(), &config.startup_model()) {
            println!("{line}");
        }
        println!("* marks the startup model. Change it with 'algocroc set default-model <id>'.");
        return Ok(());
    }

    let base_url = config.base_url(ProviderId::OpenRouter);
    let response = fetch_models(&http_client()?, &base_url, ProviderId::OpenRouter.as_str()).await?;
    let models = free_models(response.data);

    println!("🤖 Free models on OpenRouter right now");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    if models.is_empty() {
        println!("No free models found.");
    } else {
        for line in remote_listing(&models) {
            println!("{line}");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_marks_the_startup_model() {
        let lines = catalog_listing(load_builtin_providers(), "gpt-4o");
        assert_eq!(lines[0], "Pollinations (free, no login required)");
        assert!(lines.iter().any(|line| line.starts_with("  * gpt-4o - GPT-4o")));
        assert_eq!(lines.iter().filter(|line| line.contains(" * ")).count(), 1);
        assert!(lines
            .iter()
            .any(|line| line == "Puter (premium, login required)"));
    }

    #[test]
    fn remote_models_show_names_and_dates() {
        let models = vec![
            ModelInfo {
                id: "a:free".to_string(),
                name: Some("Model A".to_string()),
                created: Some(1_700_000_000_000),
            },
            ModelInfo {
                id: "b:free".to_string(),
                name: Some("b:free".to_string()),
                created: None,
            },
        ];
        assert_eq!(
            remote_listing(&models),
            vec![
                "  • a:free - Model A (2023-11-14)".to_string(),
                "  • b:free".to_string()
            ]
        );
    }
}
