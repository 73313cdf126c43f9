use std::{
    ffi::OsString,
    fs::{self, File, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use buildcreds_core::{
    CredentialSet, CredentialsError, CredentialsPersistence, CryptoError, StoreFactory,
    DEFAULT_PASSPHRASE,
};
use fs4::fs_std::FileExt;
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use tracing::{debug, instrument};

use crate::{
    encryptor::{KdfParams, PassphraseEncryptor},
    properties,
};

const FILE_PREFIX: &str = "credentials";
const FILE_SUFFIX: &str = ".encrypted.properties";

/// Credential store backed by a single properties file.
///
/// Writes go to a temp file in the same directory which is then renamed over
/// the store, so readers see either the old or the new file, never a partial one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertiesFileStore {
    path: PathBuf,
}

impl PropertiesFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn lock_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(OsString::from)
            .unwrap_or_default();
        name.push(".lock");
        self.path.with_file_name(name)
    }

    fn read_err<E: ToString>(&self, err: E) -> CredentialsError {
        CredentialsError::Read {
            path: self.path.clone(),
            reason: err.to_string(),
        }
    }

    fn write_err<E: ToString>(&self, err: E) -> CredentialsError {
        CredentialsError::Write {
            path: self.path.clone(),
            reason: err.to_string(),
        }
    }
}

/// Exclusive advisory lock on a store; released when dropped.
#[derive(Debug)]
pub struct StoreLock {
    _file: File,
}

impl CredentialsPersistence for PropertiesFileStore {
    type Lock = StoreLock;

    fn credentials_file(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> Result<StoreLock, CredentialsError> {
        let lock_path = self.lock_path();
        let lock_err = |err: std::io::Error| CredentialsError::Lock {
            path: lock_path.clone(),
            reason: err.to_string(),
        };
        if let Some(parent) = lock_path.parent() {
            fs::create_dir_all(parent).map_err(lock_err)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&lock_path)
            .map_err(lock_err)?;
        FileExt::lock_exclusive(&file).map_err(lock_err)?;
        debug!(path = %lock_path.display(), "locked credentials file");
        Ok(StoreLock { _file: file })
    }

    #[instrument(skip_all, fields(path = %self.path.display()))]
    fn read_credentials(&self) -> Result<CredentialSet, CredentialsError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!("credentials file does not exist yet");
                return Ok(CredentialSet::new());
            }
            Err(err) => return Err(self.read_err(err)),
        };

        let text = String::from_utf8(bytes).map_err(|e| self.read_err(e))?;
        properties::parse(&text).map_err(|e| self.read_err(e))
    }

    #[instrument(skip_all, fields(path = %self.path.display(), entries = credentials.len()))]
    fn store_credentials(&self, credentials: &CredentialSet) -> Result<(), CredentialsError> {
        let parent = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent).map_err(|e| self.write_err(e))?;

        let mut tmp = NamedTempFile::new_in(parent).map_err(|e| self.write_err(e))?;
        tmp.write_all(properties::render(credentials).as_bytes())
            .map_err(|e| self.write_err(e))?;
        tmp.flush().map_err(|e| self.write_err(e))?;
        tmp.as_file().sync_all().map_err(|e| self.write_err(e))?;
        tmp.persist(&self.path).map_err(|e| self.write_err(e.error))?;
        Ok(())
    }
}

/// Builds passphrase encryptors and properties-file stores.
#[derive(Debug, Clone)]
pub struct FileStoreFactory {
    default_dir: PathBuf,
    kdf: KdfParams,
}

impl FileStoreFactory {
    pub fn new(default_dir: impl Into<PathBuf>) -> Self {
        Self {
            default_dir: default_dir.into(),
            kdf: KdfParams::default(),
        }
    }

    pub fn with_kdf(mut self, kdf: KdfParams) -> Self {
        self.kdf = kdf;
        self
    }
}

impl StoreFactory for FileStoreFactory {
    type Encryptor = PassphraseEncryptor;
    type Persistence = PropertiesFileStore;

    fn encryptor_with_passphrase(
        &self,
        passphrase: &[u8],
    ) -> Result<PassphraseEncryptor, CryptoError> {
        PassphraseEncryptor::with_params(passphrase, self.kdf)
    }

    /// `credentials[.<env>][.<digest>].encrypted.properties`; the passphrase
    /// digest is left out for the default passphrase.
    fn derive_file_name(&self, env: Option<&str>, passphrase: &str) -> String {
        let mut name = String::from(FILE_PREFIX);
        if let Some(env) = env.filter(|e| !e.is_empty()) {
            name.push('.');
            name.push_str(&encode_env(env));
        }
        if passphrase != DEFAULT_PASSPHRASE {
            name.push('.');
            name.push_str(&passphrase_digest(passphrase));
        }
        name.push_str(FILE_SUFFIX);
        name
    }

    fn persistence(
        &self,
        file_name: &str,
        location: Option<&Path>,
        previous: Option<&PropertiesFileStore>,
    ) -> PropertiesFileStore {
        let dir = location
            .map(Path::to_path_buf)
            .or_else(|| {
                previous
                    .and_then(|store| store.credentials_file().parent())
                    .map(Path::to_path_buf)
            })
            .unwrap_or_else(|| self.default_dir.clone());
        PropertiesFileStore::new(dir.join(file_name))
    }
}

/// Percent-encode every byte of an env label outside `[A-Za-z0-9_-]`.
///
/// The mapping is injective, so distinct labels never share a store, and the
/// result cannot contain path separators or the `.` segment delimiter.
fn encode_env(env: &str) -> String {
    let mut encoded = String::with_capacity(env.len());
    for byte in env.bytes() {
        match byte {
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'-' | b'_' => encoded.push(byte as char),
            _ => encoded.push_str(&format!("%{byte:02X}")),
        }
    }
    encoded
}

fn passphrase_digest(passphrase: &str) -> String {
    let digest = Sha256::digest(passphrase.as_bytes());
    hex::encode(&digest[..8])
}

#[cfg(test)]
mod tests {
    use buildcreds_core::CredentialsPersistence;

    use super::*;

    #[test]
    fn missing_file_reads_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = PropertiesFileStore::new(dir.path().join("none.properties"));
        assert!(store.read_credentials().expect("read").is_empty());
    }

    #[test]
    fn store_then_read_preserves_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = PropertiesFileStore::new(dir.path().join("nested").join("c.properties"));
        let set: CredentialSet = [("z", "1"), ("a", "2"), ("m", "3")].into_iter().collect();

        store.store_credentials(&set).expect("store");
        assert_eq!(store.read_credentials().expect("read"), set);
    }

    #[test]
    fn non_utf8_file_is_read_failure() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("bad.properties");
        fs::write(&path, [0xff, 0xfe, 0x00]).expect("write");

        let err = PropertiesFileStore::new(&path)
            .read_credentials()
            .expect_err("should fail");
        assert!(matches!(err, CredentialsError::Read { .. }));
    }

    #[test]
    fn failed_write_leaves_previous_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("c.properties");
        let store = PropertiesFileStore::new(&path);
        let set: CredentialSet = [("k", "v")].into_iter().collect();
        store.store_credentials(&set).expect("store");
        let before = fs::read(&path).expect("read");

        // A directory squatting on the target makes the final rename fail.
        let blocked = PropertiesFileStore::new(dir.path().join("dir-target"));
        fs::create_dir(dir.path().join("dir-target")).expect("mkdir");
        fs::write(dir.path().join("dir-target").join("x"), "x").expect("fill dir");
        let err = blocked
            .store_credentials(&set)
            .expect_err("rename over non-empty dir");
        assert!(matches!(err, CredentialsError::Write { .. }));

        assert_eq!(fs::read(&path).expect("read"), before);
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .expect("read_dir")
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().starts_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty(), "temp file must be cleaned up");
    }

    #[test]
    fn lock_creates_sidecar_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = PropertiesFileStore::new(dir.path().join("c.properties"));
        let guard = store.lock().expect("lock");

        assert!(dir.path().join("c.properties.lock").exists());
        drop(guard);
        store.lock().expect("relock after release");
    }

    #[test]
    fn file_name_depends_on_env_and_passphrase() {
        let factory = FileStoreFactory::new("/base");

        assert_eq!(
            factory.derive_file_name(None, DEFAULT_PASSPHRASE),
            "credentials.encrypted.properties"
        );
        assert_eq!(
            factory.derive_file_name(Some("prod"), DEFAULT_PASSPHRASE),
            "credentials.prod.encrypted.properties"
        );

        let one = factory.derive_file_name(Some("prod"), "one");
        let two = factory.derive_file_name(Some("prod"), "two");
        assert_ne!(one, two);
        assert_eq!(one, factory.derive_file_name(Some("prod"), "one"));
        assert!(one.starts_with("credentials.prod."));
    }

    #[test]
    fn env_label_cannot_escape_directory() {
        let factory = FileStoreFactory::new("/base");
        let name = factory.derive_file_name(Some("../etc"), DEFAULT_PASSPHRASE);
        assert_eq!(name, "credentials.%2E%2E%2Fetc.encrypted.properties");
    }

    #[test]
    fn distinct_env_labels_get_distinct_files() {
        let factory = FileStoreFactory::new("/base");
        let names: Vec<_> = ["prod.eu", "prod_eu", "prod/eu", "prod%2Eeu"]
            .into_iter()
            .map(|env| factory.derive_file_name(Some(env), "pw"))
            .collect();

        for (i, name) in names.iter().enumerate() {
            for other in &names[i + 1..] {
                assert_ne!(name, other);
            }
        }
        assert!(names[1].starts_with("credentials.prod_eu."));
    }

    #[test]
    fn persistence_inherits_previous_directory() {
        let factory = FileStoreFactory::new("/default");
        let previous = PropertiesFileStore::new("/custom/credentials.encrypted.properties");

        let inherited = factory.persistence("next.properties", None, Some(&previous));
        assert_eq!(
            inherited.credentials_file(),
            Path::new("/custom/next.properties")
        );

        let explicit =
            factory.persistence("next.properties", Some(Path::new("/loc")), Some(&previous));
        assert_eq!(explicit.credentials_file(), Path::new("/loc/next.properties"));

        let fresh = factory.persistence("next.properties", None, None);
        assert_eq!(fresh.credentials_file(), Path::new("/default/next.properties"));
    }
}
