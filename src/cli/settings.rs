//! `nova set`, `nova unset`: edits to `config.toml`.

use std::error::Error;

use thiserror::Error;

use crate::cli::Context;
use crate::core::config::data::MIN_PREFERENCES_POLL_SECS;
use crate::core::config::{Config, CredentialBackend};
use crate::utils::url::is_http_url;

pub const KEYS: [&str; 6] = [
    "base-url",
    "credential-store",
    "memory-enabled",
    "model",
    "preferences-poll-secs",
    "markdown",
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettingError {
    #[error("Unknown config key: {0}. Valid keys: {keys}", keys = KEYS.join(", "))]
    UnknownKey(String),

    #[error("Invalid boolean value: {0}. Use 'on' or 'off' (also accepts true/false, yes/no)")]
    InvalidBoolean(String),

    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },

    #[error("A value is required for {0}")]
    MissingValue(String),
}

/// Accepts on/off, true/false, yes/no, 1/0 in any case.
pub fn parse_bool(input: &str) -> Option<bool> {
    match input.trim().to_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Some(true),
        "off" | "false" | "no" | "0" => Some(false),
        _ => None,
    }
}

fn format_bool(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}

fn bool_value(value: &str) -> Result<bool, SettingError> {
    parse_bool(value).ok_or_else(|| SettingError::InvalidBoolean(value.to_string()))
}

/// Apply `key = value` to `config`. Returns the confirmation to print.
pub fn apply_setting(config: &mut Config, key: &str, value: &str) -> Result<String, SettingError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(SettingError::MissingValue(key.to_string()));
    }
    match key {
        "base-url" => {
            if !is_http_url(value) {
                return Err(SettingError::InvalidValue {
                    key: "base-url",
                    reason: "expected an http:// or https:// URL".to_string(),
                });
            }
            config.base_url = Some(value.to_string());
            Ok(format!("Set base-url to: {value}"))
        }
        "credential-store" => {
            let backend =
                CredentialBackend::parse(value).ok_or_else(|| SettingError::InvalidValue {
                    key: "credential-store",
                    reason: "expected 'keyring' or 'file'".to_string(),
                })?;
            config.credential_store = Some(backend);
            Ok(format!("Set credential-store to: {}", backend.as_str()))
        }
        "memory-enabled" => {
            let enabled = bool_value(value)?;
            config.memory_enabled = Some(enabled);
            Ok(format!("Set memory-enabled to: {}", format_bool(enabled)))
        }
        "model" => {
            config.model = Some(value.to_string());
            Ok(format!("Set model to: {value}"))
        }
        "preferences-poll-secs" => {
            let secs: u64 = value.parse().map_err(|_| SettingError::InvalidValue {
                key: "preferences-poll-secs",
                reason: "expected a whole number of seconds".to_string(),
            })?;
            if secs < MIN_PREFERENCES_POLL_SECS {
                return Err(SettingError::InvalidValue {
                    key: "preferences-poll-secs",
                    reason: format!("must be at least {MIN_PREFERENCES_POLL_SECS}"),
                });
            }
            config.preferences_poll_secs = Some(secs);
            Ok(format!("Set preferences-poll-secs to: {secs}"))
        }
        "markdown" => {
            let enabled = bool_value(value)?;
            config.markdown = Some(enabled);
            Ok(format!("Set markdown to: {}", format_bool(enabled)))
        }
        _ => Err(SettingError::UnknownKey(key.to_string())),
    }
}

/// Remove `key` from `config`, restoring its default.
pub fn clear_setting(config: &mut Config, key: &str) -> Result<String, SettingError> {
    match key {
        "base-url" => config.base_url = None,
        "credential-store" => config.credential_store = None,
        "memory-enabled" => config.memory_enabled = None,
        "model" => config.model = None,
        "preferences-poll-secs" => config.preferences_poll_secs = None,
        "markdown" => config.markdown = None,
        _ => return Err(SettingError::UnknownKey(key.to_string())),
    }
    Ok(format!("Unset {key}"))
}

/// `nova set` with no value prints the current configuration instead.
pub fn run_set(context: &Context, key: &str, value: &[String]) -> Result<(), Box<dyn Error>> {
    if value.is_empty() {
        context.config.print_all(context.api.base_url())?;
        return Ok(());
    }
    let value = value.join(" ");
    let message = Config::mutate(|config| apply_setting(config, key, &value))??;
    println!("✅ {message}");
    Ok(())
}

pub fn run_unset(key: &str) -> Result<(), Box<dyn Error>> {
    let message = Config::mutate(|config| clear_setting(config, key))??;
    println!("✅ {message}");
    Ok(())
}
