use tracing::{info, instrument, warn};

use super::{mask_value, required};
use crate::{
    credentials::CredentialSet,
    crypto::CredentialsEncryptor,
    error::CredentialsError,
    locator::StoreBinding,
    storage::CredentialsPersistence,
};

/// Arguments of one add/update invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddCredentials {
    pub key: Option<String>,
    pub value: Option<String>,
    /// Store the entry under `hash(key)` instead of `key`.
    pub hashed_keys: bool,
}

impl AddCredentials {
    /// Fail on a missing key or value, key first.
    pub fn validate(&self) -> Result<(), CredentialsError> {
        if self.key.is_none() {
            return Err(CredentialsError::MissingArgument { name: "key" });
        }
        if self.value.is_none() {
            return Err(CredentialsError::MissingArgument { name: "value" });
        }
        Ok(())
    }
}

/// What an upsert did to the credential set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertOutcome {
    /// Identifier the value is now stored under.
    pub identifier: String,
    pub hashed_key: String,
    /// Identifier of the opposite-form entry removed to resolve a collision.
    pub removed_collision: Option<String>,
    /// Whether an entry under `identifier` was overwritten.
    pub overwritten: bool,
}

/// Add or update a credential in the bound store.
///
/// Missing `key` or `value` fails before the store is touched. Otherwise the
/// store is locked, loaded, cleared of the key's opposite identifier form,
/// updated with the encrypted value and written back as a whole.
#[instrument(skip_all, fields(hashed_keys = request.hashed_keys))]
pub fn add_credentials<E, P>(
    binding: &StoreBinding<E, P>,
    request: AddCredentials,
) -> Result<UpsertOutcome, CredentialsError>
where
    E: CredentialsEncryptor,
    P: CredentialsPersistence,
{
    let key = required(request.key, "key")?;
    let value = required(request.value, "value")?;
    let hashed_keys = request.hashed_keys;

    let encryptor = binding.encryptor();
    let persistence = binding.persistence();

    let _lock = persistence.lock()?;
    let mut credentials = persistence.read_credentials()?;

    let hashed_key = encryptor.hash(&key);
    let removed_collision = resolve_collision(&mut credentials, &key, &hashed_key, hashed_keys);

    let encrypted = encryptor.encrypt(&value)?;
    let identifier = if hashed_keys { hashed_key.clone() } else { key.clone() };
    let overwritten = credentials.set(identifier.clone(), encrypted).is_some();

    persistence.store_credentials(&credentials)?;

    info!(
        file = %persistence.credentials_file().display(),
        key = %key,
        hashed_key = %hashed_key,
        value = %mask_value(&value),
        overwritten,
        "added credentials"
    );

    Ok(UpsertOutcome {
        identifier,
        hashed_key,
        removed_collision,
        overwritten,
    })
}

/// Drop the entry stored under the identifier form the current mode does not use.
fn resolve_collision(
    credentials: &mut CredentialSet,
    key: &str,
    hashed_key: &str,
    hashed_keys: bool,
) -> Option<String> {
    let stale = if hashed_keys { key } else { hashed_key };
    let removed = credentials.remove(stale)?;
    warn!(
        "Collision: {} and {}. Removed: {}={}",
        key, hashed_key, stale, removed
    );
    Some(stale.to_string())
}
