//! Core abstractions for buildcreds: the credential set model, the encryptor and
//! persistence contracts, the store locator and the credential operations.
//! This crate does no I/O of its own; concrete stores live in `buildcreds-storage`.

pub mod credentials;
pub mod crypto;
pub mod error;
pub mod locator;
pub mod operations;
pub mod storage;

pub use credentials::CredentialSet;
pub use crypto::{CredentialsEncryptor, CryptoError};
pub use error::CredentialsError;
pub use locator::{StoreBinding, StoreFactory, StoreLocator, StoreSelection, DEFAULT_PASSPHRASE};
pub use storage::CredentialsPersistence;
