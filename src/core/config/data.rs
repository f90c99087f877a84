use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::api::client::DEFAULT_BASE_URL;

pub const DEFAULT_PREFERENCES_POLL_SECS: u64 = 30;
pub const MIN_PREFERENCES_POLL_SECS: u64 = 5;
pub const BASE_URL_ENV: &str = "NOVA_API_URL";

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CredentialBackend {
    /// System keyring (macOS Keychain, Windows Credential Manager, Secret Service)
    #[default]
    Keyring,
    /// `credentials.toml` in the user data directory
    File,
}

impl CredentialBackend {
    pub fn as_str(self) -> &'static str {
        match self {
            CredentialBackend::Keyring => "keyring",
            CredentialBackend::File => "file",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "keyring" => Some(CredentialBackend::Keyring),
            "file" => Some(CredentialBackend::File),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct Config {
    /// Base URL of the Nova API, including the `/api` prefix
    pub base_url: Option<String>,
    /// Where the login token is kept between runs
    pub credential_store: Option<CredentialBackend>,
    /// Whether new conversations use long-term memory
    pub memory_enabled: Option<bool>,
    /// Model requested through chat metadata; the server default when unset
    pub model: Option<String>,
    /// Seconds between preference refreshes in the chat view
    pub preferences_poll_secs: Option<u64>,
    /// Apply inline markdown styling to rendered messages
    pub markdown: Option<bool>,
}

fn nonblank(url: &str) -> Option<&str> {
    Some(url.trim()).filter(|url| !url.is_empty())
}

impl Config {
    /// Base URL precedence: command-line flag, then environment, then config file.
    pub fn resolve_base_url(&self, flag: Option<&str>, env: Option<&str>) -> String {
        flag.and_then(nonblank)
            .or_else(|| env.and_then(nonblank))
            .or_else(|| self.base_url.as_deref().and_then(nonblank))
            .unwrap_or(DEFAULT_BASE_URL)
            .to_string()
    }

    pub fn credential_backend(&self) -> CredentialBackend {
        self.credential_store.unwrap_or_default()
    }

    pub fn memory_enabled(&self) -> bool {
        self.memory_enabled.unwrap_or(true)
    }

    pub fn markdown(&self) -> bool {
        self.markdown.unwrap_or(true)
    }

    pub fn preferences_poll_interval(&self) -> Duration {
        let secs = self
            .preferences_poll_secs
            .unwrap_or(DEFAULT_PREFERENCES_POLL_SECS)
            .max(MIN_PREFERENCES_POLL_SECS);
        Duration::from_secs(secs)
    }
}

/// Get a user-friendly display string for a path
/// Converts absolute paths to use ~ notation on Unix-like systems when possible
///
/// # Examples
/// - Unix: `/home/user/.config/nova/config.toml` → `~/.config/nova/config.toml`
/// - Windows paths are shown unchanged
pub fn path_display<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();

    #[cfg(unix)]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let home_path = PathBuf::from(home);
            if let Ok(relative) = path.strip_prefix(&home_path) {
                return format!("~/{}", relative.display());
            }
        }
    }

    path.display().to_string()
}
