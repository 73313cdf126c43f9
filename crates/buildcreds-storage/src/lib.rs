//! Concrete credential stores with encryption at rest.
//! AES-256-GCM values keyed from a passphrase via Argon2id, persisted as an
//! ordered properties file that is replaced atomically.

pub mod encryptor;
pub mod passphrase_provider;
pub mod properties;
pub mod properties_file;

pub use encryptor::{KdfParams, PassphraseEncryptor};
pub use properties_file::{FileStoreFactory, PropertiesFileStore};
