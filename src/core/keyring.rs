use thiserror::Error;

/// Failure talking to the platform keyring.
///
/// Recoverable errors mean the backend is temporarily unavailable (a locked
/// keychain, a missing secret-service daemon); switching the credential store
/// to `file` works around them. Permanent errors are reported as-is.
#[derive(Debug, Error)]
pub enum KeyringAccessError {
    #[error("keyring temporarily unavailable: {0}")]
    Recoverable(#[source] keyring::Error),
    #[error("{0}")]
    Permanent(#[source] keyring::Error),
}

impl KeyringAccessError {
    pub fn is_recoverable(&self) -> bool {
        matches!(self, KeyringAccessError::Recoverable(_))
    }
}

impl From<keyring::Error> for KeyringAccessError {
    fn from(err: keyring::Error) -> Self {
        match err {
            keyring::Error::PlatformFailure(_) | keyring::Error::NoStorageAccess(_) => {
                KeyringAccessError::Recoverable(err)
            }
            other => KeyringAccessError::Permanent(other),
        }
    }
}
