use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// CLI surface definition.
#[derive(Parser, Debug)]
#[command(
    name = "buildcreds",
    about = "Encrypted credentials store for build pipelines",
    version,
    propagate_version = true
)]
pub struct Cli {
    /// Config file to use instead of the platform default.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Options selecting the store. Anything left out falls back to the config
/// file and `BUILDCREDS_*` environment variables.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreArgs {
    /// The credentials env.
    #[arg(long)]
    pub env: Option<String>,
    /// The credentials location (directory holding the store file).
    #[arg(long, value_name = "DIR")]
    pub loc: Option<PathBuf>,
    /// The credentials pass.
    #[arg(long)]
    pub pass: Option<String>,
    /// Store keys hashed: yes, true, on, 1 or enabled (anything else means no).
    #[arg(long, value_name = "FLAG")]
    pub hashed: Option<String>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Add or update a credential.
    Add {
        #[command(flatten)]
        store: StoreArgs,
        /// The credentials key.
        #[arg(long)]
        key: Option<String>,
        /// The credentials value.
        #[arg(long)]
        value: Option<String>,
    },
    /// Remove a credential in both its plain and hashed forms.
    Remove {
        #[command(flatten)]
        store: StoreArgs,
        #[arg(long)]
        key: Option<String>,
    },
    /// Print the decrypted value of a credential.
    Get {
        #[command(flatten)]
        store: StoreArgs,
        #[arg(long)]
        key: Option<String>,
    },
    /// List stored identifiers (never values).
    List {
        #[command(flatten)]
        store: StoreArgs,
        /// Emit JSON instead of one identifier per line.
        #[arg(long)]
        json: bool,
    },
    /// Manage CLI configuration.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Manage passphrases kept in the OS keyring.
    #[command(subcommand)]
    Keyring(KeyringCommand),
    /// Print version and exit.
    Version,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ConfigCommand {
    /// Create a default config file if one does not exist.
    Init,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum KeyringCommand {
    /// Store the passphrase for an env.
    Set {
        #[arg(long)]
        env: Option<String>,
        #[arg(long)]
        pass: String,
    },
    /// Forget the passphrase for an env.
    Clear {
        #[arg(long)]
        env: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_add_with_all_options() {
        let cli = Cli::try_parse_from([
            "buildcreds", "add", "--env", "prod", "--loc", "/tmp/creds", "--pass", "p",
            "--hashed", "no", "--key", "db.pw", "--value", "s3cr3t",
        ])
        .expect("parse should succeed");

        assert_eq!(
            cli.command,
            Command::Add {
                store: StoreArgs {
                    env: Some("prod".into()),
                    loc: Some(PathBuf::from("/tmp/creds")),
                    pass: Some("p".into()),
                    hashed: Some("no".into()),
                },
                key: Some("db.pw".into()),
                value: Some("s3cr3t".into()),
            }
        );
    }

    #[test]
    fn add_without_key_still_parses() {
        // Missing key/value is reported by the add operation, after config fallback.
        let cli = Cli::try_parse_from(["buildcreds", "add", "--value", "x"]).expect("parse");
        assert!(matches!(cli.command, Command::Add { key: None, .. }));
    }

    #[test]
    fn config_flag_is_global() {
        let cli = Cli::try_parse_from(["buildcreds", "list", "--json", "--config", "/etc/bc.toml"])
            .expect("parse");
        assert_eq!(cli.config, Some(PathBuf::from("/etc/bc.toml")));
        assert!(matches!(cli.command, Command::List { json: true, .. }));
    }

    #[test]
    fn parses_config_init_subcommand() {
        let cli = Cli::try_parse_from(["buildcreds", "config", "init"]).expect("parse");
        assert_eq!(cli.command, Command::Config(ConfigCommand::Init));
    }

    #[test]
    fn keyring_set_requires_pass() {
        assert!(Cli::try_parse_from(["buildcreds", "keyring", "set"]).is_err());
    }
}
