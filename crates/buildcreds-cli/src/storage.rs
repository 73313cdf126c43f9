use std::path::PathBuf;

use buildcreds_core::{StoreLocator, StoreSelection};
use buildcreds_storage::FileStoreFactory;
use color_eyre::Result;
use dirs::data_dir;
use tracing::debug;

pub type FileLocator = StoreLocator<FileStoreFactory>;

/// Keyring service holding per-env passphrases.
pub const KEYRING_SERVICE: &str = "buildcreds";

/// Resolve the default directory for credential stores.
pub fn default_data_dir() -> Result<PathBuf> {
    let base = data_dir().ok_or_else(|| color_eyre::eyre::eyre!("no data dir available"))?;
    Ok(base.join("buildcreds"))
}

/// Build the production locator over properties files in the data directory.
pub fn production_locator(ambient: StoreSelection) -> Result<FileLocator> {
    let root = default_data_dir()?;
    debug!(?root, "initializing credentials locator");
    Ok(StoreLocator::new(FileStoreFactory::new(root), ambient))
}

/// Helper for tests to construct a locator rooted at a temp dir with cheap key derivation.
#[cfg(test)]
pub fn test_locator(root: impl Into<PathBuf>, ambient: StoreSelection) -> FileLocator {
    use buildcreds_storage::KdfParams;

    StoreLocator::new(
        FileStoreFactory::new(root).with_kdf(KdfParams::minimal()),
        ambient,
    )
}
