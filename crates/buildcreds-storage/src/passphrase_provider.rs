use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use thiserror::Error;
use tracing::debug;

const DEFAULT_ACCOUNT: &str = "default";

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("keyring error: {0}")]
    Keyring(String),
    /// The keyring accepted the write but reading it back found nothing.
    #[error("keyring did not retain the passphrase for account `{account}`")]
    NotRetained { account: String },
    #[error("no passphrase stored in the keyring for account `{account}`")]
    Missing { account: String },
}

/// Source of per-environment passphrases (OS keychain in production; memory in tests).
/// Passphrases are never logged.
pub trait PassphraseProvider {
    /// Stored passphrase for `env`, if any.
    fn passphrase(&self, env: Option<&str>) -> Result<Option<String>, KeyError>;

    fn store(&self, env: Option<&str>, passphrase: &str) -> Result<(), KeyError>;

    /// Remove the stored passphrase; returns whether one existed.
    fn clear(&self, env: Option<&str>) -> Result<bool, KeyError>;
}

/// OS keyring-backed provider. One entry per environment label, the
/// unlabelled environment uses the `default` account.
pub struct KeyringProvider {
    service: String,
}

impl KeyringProvider {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, env: Option<&str>) -> Result<keyring::Entry, KeyError> {
        keyring::Entry::new(&self.service, account(env))
            .map_err(|e| KeyError::Keyring(e.to_string()))
    }
}

impl PassphraseProvider for KeyringProvider {
    fn passphrase(&self, env: Option<&str>) -> Result<Option<String>, KeyError> {
        match self.entry(env)?.get_password() {
            Ok(secret) => {
                debug!(account = account(env), "passphrase found in keyring");
                Ok(Some(secret))
            }
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(err) => Err(KeyError::Keyring(err.to_string())),
        }
    }

    /// Writes the entry and reads it back through a fresh handle; a backend
    /// that drops writes yields [`KeyError::NotRetained`].
    fn store(&self, env: Option<&str>, passphrase: &str) -> Result<(), KeyError> {
        self.entry(env)?
            .set_password(passphrase)
            .map_err(|e| KeyError::Keyring(e.to_string()))?;
        match self.passphrase(env)? {
            Some(stored) if stored == passphrase => Ok(()),
            _ => Err(KeyError::NotRetained {
                account: account(env).to_string(),
            }),
        }
    }

    fn clear(&self, env: Option<&str>) -> Result<bool, KeyError> {
        match self.entry(env)?.delete_credential() {
            Ok(()) => Ok(true),
            Err(keyring::Error::NoEntry) => Ok(false),
            Err(err) => Err(KeyError::Keyring(err.to_string())),
        }
    }
}

/// In-memory provider for tests and ephemeral sessions.
#[derive(Debug, Default, Clone)]
pub struct InMemoryPassphraseProvider {
    inner: Arc<Mutex<HashMap<String, String>>>,
}

impl InMemoryPassphraseProvider {
    fn entries(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, KeyError> {
        self.inner
            .lock()
            .map_err(|err| KeyError::Keyring(format!("lock poisoned: {err}")))
    }
}

impl PassphraseProvider for InMemoryPassphraseProvider {
    fn passphrase(&self, env: Option<&str>) -> Result<Option<String>, KeyError> {
        Ok(self.entries()?.get(account(env)).cloned())
    }

    fn store(&self, env: Option<&str>, passphrase: &str) -> Result<(), KeyError> {
        self.entries()?
            .insert(account(env).to_string(), passphrase.to_string());
        Ok(())
    }

    fn clear(&self, env: Option<&str>) -> Result<bool, KeyError> {
        Ok(self.entries()?.remove(account(env)).is_some())
    }
}

fn account(env: Option<&str>) -> &str {
    env.filter(|e| !e.is_empty()).unwrap_or(DEFAULT_ACCOUNT)
}
