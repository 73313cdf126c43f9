use std::{
    fs,
    path::{Path, PathBuf},
};

use color_eyre::Result;
use dirs::config_dir;
use serde::{Deserialize, Serialize};

/// Ambient configuration loaded from `~/.config/buildcreds/config.toml`
/// (platform-specific), overridable through `BUILDCREDS_*` environment variables.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct Config {
    /// Default credentials env.
    pub env: Option<String>,
    /// Directory holding the store files.
    pub location: Option<PathBuf>,
    pub passphrase: Option<String>,
    /// Hashed-keys flag, same spelling as `--hashed`.
    pub hashed: Option<String>,
    pub key: Option<String>,
    pub value: Option<String>,
    /// Look up the passphrase in the OS keyring when none is configured.
    #[serde(default)]
    pub use_keyring: bool,
}

impl Config {
    /// Apply `BUILDCREDS_*` variables on top of the file values.
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let pick = |name: &str, current: &mut Option<String>| {
            if let Some(value) = lookup(name) {
                *current = Some(value);
            }
        };
        pick("BUILDCREDS_ENV", &mut self.env);
        pick("BUILDCREDS_PASSPHRASE", &mut self.passphrase);
        pick("BUILDCREDS_HASHED", &mut self.hashed);
        pick("BUILDCREDS_KEY", &mut self.key);
        pick("BUILDCREDS_VALUE", &mut self.value);
        if let Some(location) = lookup("BUILDCREDS_LOCATION") {
            self.location = Some(PathBuf::from(location));
        }
        self
    }
}

/// Load config from a given path; if missing or empty, return defaults.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<Config> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(Config::default());
    }
    let contents = fs::read_to_string(path)?;
    if contents.trim().is_empty() {
        return Ok(Config::default());
    }
    let cfg: Config = toml::from_str(&contents)?;
    Ok(cfg)
}

/// Resolve the default config path (platform aware).
pub fn default_path() -> Result<PathBuf> {
    let base = config_dir().ok_or_else(|| color_eyre::eyre::eyre!("no config dir available"))?;
    Ok(base.join("buildcreds").join("config.toml"))
}

/// Write the given config to `path`, creating parent directories as needed.
/// An existing file is left alone to avoid clobbering user edits.
pub fn write_default_if_missing(config: &Config, path: &Path) -> Result<PathBuf> {
    if path.exists() {
        return Ok(path.to_path_buf());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let body = toml::to_string_pretty(config)?;
    fs::write(path, body)?;
    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn returns_default_when_missing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = load_from_path(dir.path().join("config.toml")).expect("load");
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn parses_custom_config() {
        let contents = r#"
            env = "ci"
            location = "/var/lib/creds"
            passphrase = "from-file"
            hashed = "off"
            key = "db.pw"
            use_keyring = true
        "#;
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        fs::write(&path, contents).expect("write temp config");

        let cfg = load_from_path(&path).expect("load");
        assert_eq!(
            cfg,
            Config {
                env: Some("ci".into()),
                location: Some(PathBuf::from("/var/lib/creds")),
                passphrase: Some("from-file".into()),
                hashed: Some("off".into()),
                key: Some("db.pw".into()),
                value: None,
                use_keyring: true,
            }
        );
    }

    #[test]
    fn env_vars_override_file_values() {
        let vars: HashMap<&str, &str> = [
            ("BUILDCREDS_ENV", "prod"),
            ("BUILDCREDS_LOCATION", "/srv/creds"),
            ("BUILDCREDS_VALUE", "v"),
        ]
        .into_iter()
        .collect();
        let cfg = Config {
            env: Some("ci".into()),
            passphrase: Some("file-pass".into()),
            ..Config::default()
        }
        .with_env_overrides(|name| vars.get(name).map(|v| v.to_string()));

        assert_eq!(cfg.env.as_deref(), Some("prod"));
        assert_eq!(cfg.location, Some(PathBuf::from("/srv/creds")));
        assert_eq!(cfg.passphrase.as_deref(), Some("file-pass"));
        assert_eq!(cfg.value.as_deref(), Some("v"));
    }

    #[test]
    fn write_default_creates_file_once() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("config.toml");
        let cfg = Config {
            env: Some("ci".into()),
            ..Config::default()
        };

        write_default_if_missing(&cfg, &path).expect("write should succeed");
        let other = Config::default();
        let second = write_default_if_missing(&other, &path).expect("second write ok");
        assert_eq!(second, path);
        let loaded = load_from_path(&path).expect("load");
        assert_eq!(loaded, cfg);
    }
}
