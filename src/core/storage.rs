//! Persisted login state.
//!
//! Two string entries survive between runs: the bearer token and the username
//! it was issued for. They are always written together on login and removed
//! together on logout.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use directories::ProjectDirs;
use keyring::Entry;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, warn};

use crate::core::config::data::path_display;
use crate::core::keyring::KeyringAccessError;

const KEYRING_SERVICE: &str = "nova";
const CREDENTIALS_FILE: &str = "credentials.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialKey {
    Token,
    Username,
}

impl CredentialKey {
    pub const ALL: [CredentialKey; 2] = [CredentialKey::Token, CredentialKey::Username];

    pub fn as_str(self) -> &'static str {
        match self {
            CredentialKey::Token => "token",
            CredentialKey::Username => "username",
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Keyring(#[from] KeyringAccessError),

    #[error("Failed to access credentials at {}: {source}", path_display(.path))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse credentials at {}: {source}", path_display(.path))]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to encode credentials: {0}")]
    Encode(#[from] toml::ser::Error),

    #[error("Could not determine a data directory for credentials")]
    NoDataDir,
}

/// Key/value store backing the login state, the way a browser page would use
/// local storage.
pub trait CredentialStore: Send + Sync {
    fn get(&self, key: CredentialKey) -> Result<Option<String>, StoreError>;
    fn set(&self, key: CredentialKey, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: CredentialKey) -> Result<(), StoreError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub token: String,
    pub username: String,
}

/// Read the stored login, if both a non-empty token and a username exist.
pub fn load_credentials(store: &dyn CredentialStore) -> Result<Option<Credentials>, StoreError> {
    let Some(token) = store.get(CredentialKey::Token)?.filter(|t| !t.is_empty()) else {
        return Ok(None);
    };
    let username = store.get(CredentialKey::Username)?.unwrap_or_default();
    Ok(Some(Credentials { token, username }))
}

pub fn save_credentials(
    store: &dyn CredentialStore,
    credentials: &Credentials,
) -> Result<(), StoreError> {
    store.set(CredentialKey::Token, &credentials.token)?;
    if let Err(err) = store.set(CredentialKey::Username, &credentials.username) {
        if let Err(rollback) = store.remove(CredentialKey::Token) {
            warn!("failed to roll back token after username write failed: {rollback}");
        }
        return Err(err);
    }
    Ok(())
}

/// Remove both entries. Every key is attempted even if an earlier removal fails.
pub fn clear_credentials(store: &dyn CredentialStore) -> Result<(), StoreError> {
    let mut first_error = None;
    for key in CredentialKey::ALL {
        if let Err(err) = store.remove(key) {
            first_error.get_or_insert(err);
        }
    }
    match first_error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Entries kept in the platform keyring under the `nova` service.
pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    pub fn new() -> Self {
        Self {
            service: KEYRING_SERVICE.to_string(),
        }
    }

    fn entry(&self, key: CredentialKey) -> Result<Entry, StoreError> {
        Entry::new(&self.service, key.as_str())
            .map_err(|err| StoreError::Keyring(KeyringAccessError::from(err)))
    }
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore for KeyringStore {
    fn get(&self, key: CredentialKey) -> Result<Option<String>, StoreError> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(err) => {
                debug!(key = key.as_str(), error = %err, "keyring lookup failed");
                Err(StoreError::Keyring(err.into()))
            }
        }
    }

    fn set(&self, key: CredentialKey, value: &str) -> Result<(), StoreError> {
        self.entry(key)?
            .set_password(value)
            .map_err(|err| StoreError::Keyring(err.into()))
    }

    fn remove(&self, key: CredentialKey) -> Result<(), StoreError> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(err) => Err(StoreError::Keyring(err.into())),
        }
    }
}

/// Entries kept in a TOML file, for systems without a usable keyring.
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    pub fn default_location() -> Result<Self, StoreError> {
        let dirs = ProjectDirs::from("dev", "nova", "nova").ok_or(StoreError::NoDataDir)?;
        Ok(Self::new(dirs.data_dir().join(CREDENTIALS_FILE)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<BTreeMap<String, String>, StoreError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let contents = fs::read_to_string(&self.path).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| StoreError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    fn write(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        if entries.is_empty() {
            return match fs::remove_file(&self.path) {
                Ok(()) => Ok(()),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(source) => Err(self.io_error(source)),
            };
        }

        let contents = toml::to_string(entries)?;
        let parent = self
            .path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty());
        if let Some(dir) = parent {
            fs::create_dir_all(dir).map_err(|source| self.io_error(source))?;
        }

        let mut temp_file = match parent {
            Some(dir) => NamedTempFile::new_in(dir),
            None => NamedTempFile::new(),
        }
        .map_err(|source| self.io_error(source))?;

        restrict_permissions(temp_file.as_file()).map_err(|source| self.io_error(source))?;
        temp_file
            .write_all(contents.as_bytes())
            .and_then(|_| temp_file.as_file_mut().sync_all())
            .map_err(|source| self.io_error(source))?;
        temp_file
            .persist(&self.path)
            .map_err(|err| self.io_error(err.error))?;
        Ok(())
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn update<F>(&self, mutate: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut BTreeMap<String, String>),
    {
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut entries = self.read()?;
        mutate(&mut entries);
        self.write(&entries)
    }
}

#[cfg(unix)]
fn restrict_permissions(file: &fs::File) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_file: &fs::File) -> std::io::Result<()> {
    Ok(())
}

impl CredentialStore for FileStore {
    fn get(&self, key: CredentialKey) -> Result<Option<String>, StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(self.read()?.remove(key.as_str()))
    }

    fn set(&self, key: CredentialKey, value: &str) -> Result<(), StoreError> {
        self.update(|entries| {
            entries.insert(key.as_str().to_string(), value.to_string());
        })
    }

    fn remove(&self, key: CredentialKey) -> Result<(), StoreError> {
        self.update(|entries| {
            entries.remove(key.as_str());
        })
    }
}

/// Process-local store; nothing outlives the process.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<&'static str, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryStore {
    fn get(&self, key: CredentialKey) -> Result<Option<String>, StoreError> {
        let entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        Ok(entries.get(key.as_str()).cloned())
    }

    fn set(&self, key: CredentialKey, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        entries.insert(key.as_str(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: CredentialKey) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        entries.remove(key.as_str());
        Ok(())
    }
}
