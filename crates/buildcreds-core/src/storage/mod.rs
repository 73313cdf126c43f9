use std::path::Path;

use crate::{credentials::CredentialSet, error::CredentialsError};

pub mod memory;

pub use memory::{InMemoryPersistence, MaskingEncryptor};

/// Contract for the physical store a credential set is loaded from and written back to.
pub trait CredentialsPersistence {
    /// Guard held across a load/persist pair; released on drop.
    type Lock;

    /// The backing file, for reporting.
    fn credentials_file(&self) -> &Path;

    /// Take an exclusive advisory lock on the store.
    fn lock(&self) -> Result<Self::Lock, CredentialsError>;

    /// Load the full credential set. A store that does not exist yet reads as empty.
    fn read_credentials(&self) -> Result<CredentialSet, CredentialsError>;

    /// Replace the store contents with `credentials`. Either the whole set is
    /// written or the previous contents remain.
    fn store_credentials(&self, credentials: &CredentialSet) -> Result<(), CredentialsError>;
}
