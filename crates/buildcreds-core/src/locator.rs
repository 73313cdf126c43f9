//! Selection of the credential store and encryption capability for one invocation.
//!
//! The ambient configuration is handed to [`StoreLocator`] as a plain value,
//! and resolving explicit overrides yields a new [`StoreBinding`] instead of
//! mutating the default one.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use tracing::debug;

use crate::{
    crypto::{CredentialsEncryptor, CryptoError},
    storage::CredentialsPersistence,
};

/// Passphrase used when none is supplied or configured.
pub const DEFAULT_PASSPHRASE: &str = ">>Default passphrase to encrypt passwords!<<";

/// Environment label, passphrase and location as supplied by one configuration layer.
/// `None` means the layer did not specify the value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreSelection {
    pub env: Option<String>,
    pub passphrase: Option<String>,
    pub location: Option<PathBuf>,
}

impl StoreSelection {
    pub fn is_empty(&self) -> bool {
        self.env.is_none() && self.passphrase.is_none() && self.location.is_none()
    }
}

/// Builds the concrete encryptor and persistence types a binding is made of.
pub trait StoreFactory {
    type Encryptor: CredentialsEncryptor;
    type Persistence: CredentialsPersistence;

    fn encryptor_with_passphrase(&self, passphrase: &[u8]) -> Result<Self::Encryptor, CryptoError>;

    /// Base name of the store file for an environment and effective passphrase.
    /// Must be a pure function of its inputs.
    fn derive_file_name(&self, env: Option<&str>, passphrase: &str) -> String;

    /// Persistence for `file_name` under `location`. Without a location, the
    /// directory of `previous` is reused, falling back to the factory default.
    fn persistence(
        &self,
        file_name: &str,
        location: Option<&Path>,
        previous: Option<&Self::Persistence>,
    ) -> Self::Persistence;
}

/// The (store, encryption capability) pair one invocation operates against.
#[derive(Debug)]
pub struct StoreBinding<E, P> {
    encryptor: Arc<E>,
    persistence: Arc<P>,
}

impl<E, P> StoreBinding<E, P> {
    pub fn new(encryptor: E, persistence: P) -> Self {
        Self {
            encryptor: Arc::new(encryptor),
            persistence: Arc::new(persistence),
        }
    }

    pub fn encryptor(&self) -> &E {
        &self.encryptor
    }

    pub fn persistence(&self) -> &P {
        &self.persistence
    }
}

impl<E, P> Clone for StoreBinding<E, P> {
    fn clone(&self) -> Self {
        Self {
            encryptor: Arc::clone(&self.encryptor),
            persistence: Arc::clone(&self.persistence),
        }
    }
}

pub type FactoryBinding<F> =
    StoreBinding<<F as StoreFactory>::Encryptor, <F as StoreFactory>::Persistence>;

/// Resolves which store binding is in effect, given the ambient configuration.
pub struct StoreLocator<F> {
    factory: F,
    ambient: StoreSelection,
}

impl<F: StoreFactory> StoreLocator<F> {
    pub fn new(factory: F, ambient: StoreSelection) -> Self {
        Self { factory, ambient }
    }

    /// Explicit passphrase, else the ambient one, else [`DEFAULT_PASSPHRASE`].
    pub fn effective_passphrase<'a>(&'a self, explicit: Option<&'a str>) -> &'a str {
        explicit
            .or(self.ambient.passphrase.as_deref())
            .unwrap_or(DEFAULT_PASSPHRASE)
    }

    /// Binding built purely from the ambient configuration.
    pub fn default_binding(&self) -> Result<FactoryBinding<F>, CryptoError> {
        let passphrase = self.effective_passphrase(None);
        let persistence = self.default_persistence();
        let encryptor = self.factory.encryptor_with_passphrase(passphrase.as_bytes())?;
        debug!(
            file = %persistence.credentials_file().display(),
            "built default credentials binding"
        );
        Ok(StoreBinding::new(encryptor, persistence))
    }

    /// Apply explicit overrides on top of `default`.
    ///
    /// With no overrides the default binding is returned unchanged. Any
    /// override selects a freshly derived store; an explicit passphrase also
    /// replaces the encryption capability.
    pub fn resolve(
        &self,
        explicit: &StoreSelection,
        default: &FactoryBinding<F>,
    ) -> Result<FactoryBinding<F>, CryptoError> {
        if explicit.is_empty() {
            return Ok(default.clone());
        }

        let persistence = self.overridden_persistence(explicit, default.persistence());
        let encryptor = match explicit.passphrase {
            Some(_) => Arc::new(self.explicit_encryptor(explicit)?),
            None => Arc::clone(&default.encryptor),
        };
        Ok(StoreBinding {
            encryptor,
            persistence: Arc::new(persistence),
        })
    }

    /// Binding for one invocation: [`resolve`](Self::resolve) against the
    /// default binding, without deriving the default encryptor when an
    /// explicit passphrase replaces it anyway.
    pub fn bind(&self, explicit: &StoreSelection) -> Result<FactoryBinding<F>, CryptoError> {
        if explicit.passphrase.is_none() {
            let default = self.default_binding()?;
            return self.resolve(explicit, &default);
        }

        let persistence = self.overridden_persistence(explicit, &self.default_persistence());
        let encryptor = self.explicit_encryptor(explicit)?;
        Ok(StoreBinding::new(encryptor, persistence))
    }

    fn default_persistence(&self) -> F::Persistence {
        let passphrase = self.effective_passphrase(None);
        let file_name = self.factory.derive_file_name(self.ambient.env.as_deref(), passphrase);
        self.factory.persistence(&file_name, self.ambient.location.as_deref(), None)
    }

    /// Store derived from the effective env, passphrase and location.
    fn overridden_persistence(
        &self,
        explicit: &StoreSelection,
        previous: &F::Persistence,
    ) -> F::Persistence {
        let env = explicit.env.as_deref().or(self.ambient.env.as_deref());
        let passphrase = self.effective_passphrase(explicit.passphrase.as_deref());
        let location = explicit.location.as_deref().or(self.ambient.location.as_deref());

        let file_name = self.factory.derive_file_name(env, passphrase);
        debug!(file = %file_name, env, "resolved credentials binding from overrides");
        self.factory.persistence(&file_name, location, Some(previous))
    }

    fn explicit_encryptor(&self, explicit: &StoreSelection) -> Result<F::Encryptor, CryptoError> {
        let passphrase = self.effective_passphrase(explicit.passphrase.as_deref());
        self.factory.encryptor_with_passphrase(passphrase.as_bytes())
    }
}
