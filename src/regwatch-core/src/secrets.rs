//! API-key storage backed by the OS keyring.
//!
//! Keys are stored under the "regwatch" service with one entry per registry
//! source, so the key never has to live in the config file.

use crate::models::ApiKey;
use thiserror::Error;

const SERVICE_NAME: &str = "regwatch";

#[derive(Debug, Error)]
pub enum SecretsError {
    #[error("credential not found: {key}")]
    NotFound { key: String },

    #[error("keyring access denied: {0}")]
    AccessDenied(String),

    #[error("keyring unavailable: {0}")]
    Unavailable(String),

    #[error("keyring error: {0}")]
    Other(String),
}

impl From<keyring::Error> for SecretsError {
    fn from(err: keyring::Error) -> Self {
        match err {
            keyring::Error::NoEntry => SecretsError::NotFound {
                key: "unknown".into(),
            },
            keyring::Error::NoStorageAccess(e) => SecretsError::AccessDenied(e.to_string()),
            keyring::Error::PlatformFailure(e) => SecretsError::Unavailable(e.to_string()),
            other => SecretsError::Other(other.to_string()),
        }
    }
}

pub type SecretsResult<T> = Result<T, SecretsError>;

/// Credential store for registry API keys.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    service: String,
}

impl Default for CredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore {
    pub fn new() -> Self {
        Self {
            service: SERVICE_NAME.into(),
        }
    }

    fn build_key(source: &str) -> String {
        format!("{source}/api_key")
    }

    /// Store the API key for a registry source (e.g. "companies-house").
    pub fn store_api_key(&self, source: &str, api_key: &ApiKey) -> SecretsResult<()> {
        let key = Self::build_key(source);
        let entry = keyring::Entry::new(&self.service, &key)?;
        entry.set_password(api_key.expose())?;
        tracing::debug!(source = source, "stored API key in keyring");
        Ok(())
    }

    /// Retrieve the API key for a registry source.
    ///
    /// Returns `SecretsError::NotFound` if no key is stored.
    pub fn get_api_key(&self, source: &str) -> SecretsResult<ApiKey> {
        let key = Self::build_key(source);
        let entry = keyring::Entry::new(&self.service, &key)?;
        match entry.get_password() {
            Ok(secret) => Ok(ApiKey::new(secret)),
            Err(keyring::Error::NoEntry) => Err(SecretsError::NotFound { key }),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete the stored API key. `Ok(())` even if none existed.
    pub fn delete_api_key(&self, source: &str) -> SecretsResult<()> {
        let key = Self::build_key(source);
        let entry = keyring::Entry::new(&self.service, &key)?;
        match entry.delete_credential() {
            Ok(()) => {
                tracing::debug!(source = source, "deleted API key from keyring");
                Ok(())
            }
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
