use thiserror::Error;

/// Errors produced by encryption capabilities.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    /// The passphrase could not be turned into key material.
    #[error("key derivation failed: {reason}")]
    KeyDerivation { reason: String },
    #[error("encryption failed: {reason}")]
    Encrypt { reason: String },
    /// Wrong passphrase, tampered value, or malformed ciphertext.
    #[error("decryption failed: {reason}")]
    Decrypt { reason: String },
}

/// Encryption capability seeded from a passphrase.
///
/// `hash` must be deterministic for a given capability: the same key always
/// yields the same identifier. `encrypt` need not be deterministic, but every
/// ciphertext it produces must `decrypt` back to the original plaintext with a
/// capability built from the same passphrase.
pub trait CredentialsEncryptor {
    /// Derive the hashed identifier for a plain credential key.
    fn hash(&self, key: &str) -> String;

    fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError>;

    fn decrypt(&self, ciphertext: &str) -> Result<String, CryptoError>;
}
