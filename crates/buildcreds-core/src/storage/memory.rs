use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard},
};

use crate::{
    credentials::CredentialSet,
    crypto::{CredentialsEncryptor, CryptoError},
    error::CredentialsError,
    storage::CredentialsPersistence,
};

/// In-memory persistence for tests and dry runs. Clones share the same state,
/// so a test can keep a handle and inspect what an operation wrote.
#[derive(Debug, Clone)]
pub struct InMemoryPersistence {
    path: PathBuf,
    inner: Arc<Mutex<MemoryState>>,
}

#[derive(Debug, Default)]
struct MemoryState {
    credentials: Option<CredentialSet>,
    reads: usize,
    writes: usize,
    fail_reads: bool,
    fail_writes: bool,
}

impl InMemoryPersistence {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            inner: Arc::default(),
        }
    }

    pub fn with_credentials(path: impl Into<PathBuf>, credentials: CredentialSet) -> Self {
        let store = Self::new(path);
        if let Ok(mut state) = store.inner.lock() {
            state.credentials = Some(credentials);
        }
        store
    }

    /// Last stored set, or `None` if nothing was ever stored.
    pub fn snapshot(&self) -> Option<CredentialSet> {
        self.inner.lock().ok().and_then(|s| s.credentials.clone())
    }

    pub fn reads(&self) -> usize {
        self.inner.lock().map(|s| s.reads).unwrap_or_default()
    }

    pub fn writes(&self) -> usize {
        self.inner.lock().map(|s| s.writes).unwrap_or_default()
    }

    /// Make every subsequent read fail.
    pub fn fail_reads(&self) {
        if let Ok(mut state) = self.inner.lock() {
            state.fail_reads = true;
        }
    }

    /// Make every subsequent write fail without touching the stored set.
    pub fn fail_writes(&self) {
        if let Ok(mut state) = self.inner.lock() {
            state.fail_writes = true;
        }
    }

    fn state(&self) -> Result<MutexGuard<'_, MemoryState>, CredentialsError> {
        self.inner.lock().map_err(|err| CredentialsError::Lock {
            path: self.path.clone(),
            reason: format!("lock poisoned: {err}"),
        })
    }
}

impl CredentialsPersistence for InMemoryPersistence {
    type Lock = ();

    fn credentials_file(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> Result<Self::Lock, CredentialsError> {
        Ok(())
    }

    fn read_credentials(&self) -> Result<CredentialSet, CredentialsError> {
        let mut state = self.state()?;
        state.reads += 1;
        if state.fail_reads {
            return Err(CredentialsError::Read {
                path: self.path.clone(),
                reason: "simulated read failure".to_string(),
            });
        }
        Ok(state.credentials.clone().unwrap_or_default())
    }

    fn store_credentials(&self, credentials: &CredentialSet) -> Result<(), CredentialsError> {
        let mut state = self.state()?;
        if state.fail_writes {
            return Err(CredentialsError::Write {
                path: self.path.clone(),
                reason: "simulated write failure".to_string(),
            });
        }
        state.writes += 1;
        state.credentials = Some(credentials.clone());
        Ok(())
    }
}

/// XOR-masking encryptor for tests.
/// This is not cryptographically secure; production code uses the
/// AES-GCM encryptor from `buildcreds-storage`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskingEncryptor {
    mask: u8,
}

impl MaskingEncryptor {
    pub fn with_passphrase(passphrase: &[u8]) -> Self {
        // Never zero, so the mask always changes the bytes.
        let mask = passphrase.iter().fold(0xA5u8, |acc, b| acc.rotate_left(3) ^ b) | 1;
        Self { mask }
    }
}

impl CredentialsEncryptor for MaskingEncryptor {
    fn hash(&self, key: &str) -> String {
        // FNV-1a, seeded with the mask.
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in std::iter::once(self.mask).chain(key.bytes()) {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
        }
        format!("{hash:016x}")
    }

    fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError> {
        let body: String = plaintext
            .bytes()
            .map(|b| format!("{:02x}", b ^ self.mask))
            .collect();
        Ok(format!("{:02x}:{body}", self.mask))
    }

    fn decrypt(&self, ciphertext: &str) -> Result<String, CryptoError> {
        let (tag, body) = ciphertext
            .split_once(':')
            .ok_or_else(|| decrypt_err("missing mask tag"))?;
        if u8::from_str_radix(tag, 16).ok() != Some(self.mask) {
            return Err(decrypt_err("mask mismatch"));
        }
        if !body.is_ascii() || body.len() % 2 != 0 {
            return Err(decrypt_err("malformed body"));
        }
        let bytes = (0..body.len())
            .step_by(2)
            .map(|i| {
                u8::from_str_radix(&body[i..i + 2], 16)
                    .map(|b| b ^ self.mask)
                    .map_err(|e| decrypt_err(&e.to_string()))
            })
            .collect::<Result<Vec<u8>, _>>()?;
        String::from_utf8(bytes).map_err(|e| decrypt_err(&e.to_string()))
    }
}

fn decrypt_err(reason: &str) -> CryptoError {
    CryptoError::Decrypt {
        reason: reason.to_string(),
    }
}
