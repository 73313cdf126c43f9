use std::fmt;

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use argon2::{Algorithm, Argon2, Params, Version};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use buildcreds_core::{CredentialsEncryptor, CryptoError};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

/// Fixed Argon2id salt. Stores carry no per-file salt, so every invocation
/// with the same passphrase must derive the same keys.
const KDF_SALT: &[u8; 16] = b"buildcreds.v1.kd";
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    /// Memory cost in KiB.
    pub memory_cost: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for KdfParams {
    /// OWASP-recommended Argon2id minimums.
    fn default() -> Self {
        Self {
            memory_cost: 19_456,
            iterations: 2,
            parallelism: 1,
        }
    }
}

impl KdfParams {
    /// Cheapest parameters Argon2 accepts. Only for tests; stores written with
    /// these cannot be opened with the defaults.
    pub fn minimal() -> Self {
        Self {
            memory_cost: 8,
            iterations: 1,
            parallelism: 1,
        }
    }
}

/// AES-256-GCM encryptor keyed from a passphrase.
///
/// Argon2id stretches the passphrase into 64 bytes: the first half keys the
/// cipher, the second half keys the identifier hash.
#[derive(Clone)]
pub struct PassphraseEncryptor {
    cipher: Aes256Gcm,
    hash_key: Zeroizing<[u8; 32]>,
}

impl fmt::Debug for PassphraseEncryptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PassphraseEncryptor").finish_non_exhaustive()
    }
}

impl PassphraseEncryptor {
    pub fn with_passphrase(passphrase: &[u8]) -> Result<Self, CryptoError> {
        Self::with_params(passphrase, KdfParams::default())
    }

    pub fn with_params(passphrase: &[u8], kdf: KdfParams) -> Result<Self, CryptoError> {
        let params = Params::new(kdf.memory_cost, kdf.iterations, kdf.parallelism, Some(64))
            .map_err(|e| kdf_err(format!("invalid Argon2id parameters: {e}")))?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        let mut output = Zeroizing::new([0u8; 64]);
        argon2
            .hash_password_into(passphrase, KDF_SALT, &mut output[..])
            .map_err(|e| kdf_err(format!("Argon2id failed: {e}")))?;

        let cipher = Aes256Gcm::new_from_slice(&output[..32])
            .map_err(|e| kdf_err(format!("cipher init failed: {e}")))?;
        let mut hash_key = Zeroizing::new([0u8; 32]);
        hash_key.copy_from_slice(&output[32..]);

        Ok(Self { cipher, hash_key })
    }
}

impl CredentialsEncryptor for PassphraseEncryptor {
    fn hash(&self, key: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(&self.hash_key[..]);
        hasher.update(key.as_bytes());
        hex::encode(hasher.finalize())
    }

    fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|e| CryptoError::Encrypt {
                reason: e.to_string(),
            })?;

        let mut blob = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        blob.extend_from_slice(nonce.as_slice());
        blob.extend_from_slice(&ciphertext);
        Ok(STANDARD.encode(blob))
    }

    fn decrypt(&self, ciphertext: &str) -> Result<String, CryptoError> {
        let blob = STANDARD
            .decode(ciphertext.trim())
            .map_err(|e| decrypt_err(format!("base64 decode failed: {e}")))?;
        if blob.len() < NONCE_LEN + TAG_LEN {
            return Err(decrypt_err(format!(
                "expected at least {} bytes, got {}",
                NONCE_LEN + TAG_LEN,
                blob.len()
            )));
        }

        let (nonce, body) = blob.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), body)
            .map_err(|_| decrypt_err("wrong passphrase or corrupted value".to_string()))?;
        String::from_utf8(plaintext).map_err(|e| decrypt_err(e.to_string()))
    }
}

fn kdf_err(reason: String) -> CryptoError {
    CryptoError::KeyDerivation { reason }
}

fn decrypt_err(reason: String) -> CryptoError {
    CryptoError::Decrypt { reason }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encryptor(passphrase: &str) -> PassphraseEncryptor {
        PassphraseEncryptor::with_params(passphrase.as_bytes(), KdfParams::minimal())
            .expect("encryptor")
    }

    #[test]
    fn round_trip_encrypts_and_decrypts() {
        let enc = encryptor("pass");
        let ciphertext = enc.encrypt("hello-build").expect("encrypt");

        assert!(!ciphertext.contains("hello-build"));
        assert_eq!(enc.decrypt(&ciphertext).expect("decrypt"), "hello-build");
    }

    #[test]
    fn ciphertext_is_randomized() {
        let enc = encryptor("pass");
        let first = enc.encrypt("same").expect("encrypt");
        let second = enc.encrypt("same").expect("encrypt");
        assert_ne!(first, second);
    }

    #[test]
    fn hash_is_deterministic_and_keyed() {
        let enc = encryptor("pass");
        let again = encryptor("pass");
        let other = encryptor("other");

        assert_eq!(enc.hash("db.pw"), enc.hash("db.pw"));
        assert_eq!(enc.hash("db.pw"), again.hash("db.pw"));
        assert_ne!(enc.hash("db.pw"), other.hash("db.pw"));
        assert_eq!(enc.hash("db.pw").len(), 64);
    }

    #[test]
    fn wrong_passphrase_fails_to_decrypt() {
        let ciphertext = encryptor("right").encrypt("value").expect("encrypt");
        let err = encryptor("wrong")
            .decrypt(&ciphertext)
            .expect_err("should fail");
        assert!(matches!(err, CryptoError::Decrypt { .. }));
    }

    #[test]
    fn truncated_value_is_rejected() {
        let err = encryptor("pass")
            .decrypt(&STANDARD.encode([0u8; 8]))
            .expect_err("too short");
        assert!(matches!(err, CryptoError::Decrypt { .. }));
    }

    #[test]
    fn invalid_params_are_reported() {
        let err = PassphraseEncryptor::with_params(
            b"pass",
            KdfParams {
                memory_cost: 1,
                iterations: 1,
                parallelism: 1,
            },
        )
        .expect_err("memory below minimum");
        assert!(matches!(err, CryptoError::KeyDerivation { .. }));
    }
}
