//! Settings management for the `set` and `unset` subcommands.
//!
//! Each key has a [`SettingHandler`] that validates input and edits a
//! [`Config`] in memory; persisting goes through [`Config::mutate`] so the
//! file is re-read and written atomically.

pub mod error;
pub mod handlers;
pub mod registry;

pub use error::SettingError;
pub use registry::SettingRegistry;

use crate::core::config::data::Config;

/// Trait for handling a configuration setting.
pub trait SettingHandler: Send + Sync {
    /// Returns the configuration key this handler manages.
    fn key(&self) -> &'static str;

    /// Validate `value` and store it in `config`. Returns the message to show.
    fn set(&self, value: &str, config: &mut Config) -> Result<String, SettingError>;

    /// Clear the value so the built-in default applies again.
    fn unset(&self, config: &mut Config) -> String;

    /// Format the current value for display in `algocroc set` output.
    fn format(&self, config: &Config) -> String;
}

/// Run `f` against the freshest config; nothing is written when it fails.
fn mutate_config<F>(f: F) -> Result<String, SettingError>
where
    F: FnOnce(&mut Config) -> Result<String, SettingError>,
{
    Config::mutate(|config| f(config).map_err(|err| Box::new(err) as Box<dyn std::error::Error>))
        .map_err(|err| match err.downcast::<SettingError>() {
            Ok(setting_error) => *setting_error,
            Err(other) => SettingError::ConfigError(other.to_string()),
        })
}

/// `algocroc set <key> <value...>`.
pub fn apply_set(registry: &SettingRegistry, key: &str, value: &[String]) -> Result<String, SettingError> {
    let handler = registry
        .get(key)
        .ok_or_else(|| SettingError::UnknownKey(key.to_string()))?;
    let value = value.join(" ");
    mutate_config(|config| handler.set(value.trim(), config))
}

/// `algocroc unset <key>`.
pub fn apply_unset(registry: &SettingRegistry, key: &str) -> Result<String, SettingError> {
    let handler = registry
        .get(key)
        .ok_or_else(|| SettingError::UnknownKey(key.to_string()))?;
    mutate_config(|config| Ok(handler.unset(config)))
}

/// Every key with its current value, in display order.
pub fn describe_all(registry: &SettingRegistry, config: &Config) -> Vec<String> {
    registry
        .keys_display_order()
        .iter()
        .filter_map(|key| registry.get(key))
        .map(|handler| format!("  {}: {}", handler.key(), handler.format(config)))
        .collect()
}
