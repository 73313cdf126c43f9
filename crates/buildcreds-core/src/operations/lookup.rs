use tracing::{debug, instrument};

use super::required;
use crate::{
    crypto::CredentialsEncryptor, error::CredentialsError, locator::StoreBinding,
    storage::CredentialsPersistence,
};

/// Decrypt the value stored for `key`.
///
/// The identifier form selected by `hashed_keys` is tried first, then the
/// other form, so entries written before a mode switch are still found.
#[instrument(skip_all, fields(hashed_keys = hashed_keys))]
pub fn get_credential<E, P>(
    binding: &StoreBinding<E, P>,
    key: Option<String>,
    hashed_keys: bool,
) -> Result<Option<String>, CredentialsError>
where
    E: CredentialsEncryptor,
    P: CredentialsPersistence,
{
    let key = required(key, "key")?;
    let encryptor = binding.encryptor();
    let credentials = binding.persistence().read_credentials()?;

    let hashed_key = encryptor.hash(&key);
    let (preferred, fallback) = if hashed_keys {
        (hashed_key.as_str(), key.as_str())
    } else {
        (key.as_str(), hashed_key.as_str())
    };

    let Some((identifier, ciphertext)) = [preferred, fallback]
        .into_iter()
        .find_map(|id| credentials.get(id).map(|value| (id, value)))
    else {
        debug!(key = %key, "no credentials stored");
        return Ok(None);
    };

    debug!(key = %key, identifier, "found credentials");
    Ok(Some(encryptor.decrypt(ciphertext)?))
}

/// Identifiers in stored order. Values are never returned.
pub fn list_identifiers<E, P>(binding: &StoreBinding<E, P>) -> Result<Vec<String>, CredentialsError>
where
    P: CredentialsPersistence,
{
    let credentials = binding.persistence().read_credentials()?;
    Ok(credentials.identifiers().map(str::to_string).collect())
}
