//! Resolution of invocation parameters: command option, then ambient
//! configuration, then default.

use buildcreds_core::StoreSelection;
use buildcreds_storage::passphrase_provider::{KeyError, PassphraseProvider};
use tracing::debug;

use crate::{cli::StoreArgs, config::Config};

/// Parse a hashed-keys flag; only `yes`, `true`, `on`, `1` and `enabled`
/// (any case) mean true.
pub fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.to_ascii_lowercase().as_str(),
        "yes" | "true" | "on" | "1" | "enabled"
    )
}

/// Hashed-keys mode: `--hashed`, else configured, else on.
pub fn hashed_keys(args: &StoreArgs, config: &Config) -> bool {
    args.hashed
        .as_deref()
        .or(config.hashed.as_deref())
        .map(parse_flag)
        .unwrap_or(true)
}

/// Store selection given explicitly on the command line.
pub fn explicit_selection(args: &StoreArgs) -> StoreSelection {
    StoreSelection {
        env: args.env.clone(),
        passphrase: args.pass.clone(),
        location: args.loc.clone(),
    }
}

/// Store selection from the config file, environment and, when enabled, the keyring.
///
/// The keyring entry is looked up for the env the invocation will use
/// (`--env`, else configured). It is skipped when a passphrase is configured
/// or given with `--pass`. A missing entry is an error.
pub fn ambient_selection(
    config: &Config,
    args: &StoreArgs,
    keyring: &dyn PassphraseProvider,
) -> Result<StoreSelection, KeyError> {
    let passphrase = match &config.passphrase {
        Some(passphrase) => Some(passphrase.clone()),
        None if config.use_keyring && args.pass.is_none() => {
            let env = args.env.as_deref().or(config.env.as_deref());
            let found = keyring.passphrase(env)?;
            debug!(found = found.is_some(), "consulted keyring for passphrase");
            let passphrase = found.ok_or_else(|| KeyError::Missing {
                account: env.filter(|e| !e.is_empty()).unwrap_or("default").to_string(),
            })?;
            Some(passphrase)
        }
        None => None,
    };
    Ok(StoreSelection {
        env: config.env.clone(),
        passphrase,
        location: config.location.clone(),
    })
}

/// Option value, else the configured one.
pub fn or_configured(explicit: Option<String>, configured: &Option<String>) -> Option<String> {
    explicit.or_else(|| configured.clone())
}
