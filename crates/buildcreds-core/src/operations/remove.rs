use tracing::{info, instrument};

use super::required;
use crate::{
    crypto::CredentialsEncryptor, error::CredentialsError, locator::StoreBinding,
    storage::CredentialsPersistence,
};

/// Remove `key` in both its plain and hashed forms, returning how many
/// entries were dropped. The store is only rewritten when something changed.
#[instrument(skip_all)]
pub fn remove_credentials<E, P>(
    binding: &StoreBinding<E, P>,
    key: Option<String>,
) -> Result<usize, CredentialsError>
where
    E: CredentialsEncryptor,
    P: CredentialsPersistence,
{
    let key = required(key, "key")?;
    let persistence = binding.persistence();

    let _lock = persistence.lock()?;
    let mut credentials = persistence.read_credentials()?;

    let hashed_key = binding.encryptor().hash(&key);
    let removed = [key.as_str(), hashed_key.as_str()]
        .into_iter()
        .filter(|id| credentials.remove(id).is_some())
        .count();

    if removed > 0 {
        persistence.store_credentials(&credentials)?;
    }

    info!(
        file = %persistence.credentials_file().display(),
        key = %key,
        hashed_key = %hashed_key,
        removed,
        "removed credentials"
    );
    Ok(removed)
}
