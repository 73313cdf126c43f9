mod cli;
mod commands;
mod config;
mod settings;
mod storage;

use std::path::Path;

use buildcreds_storage::passphrase_provider::{KeyringProvider, PassphraseProvider};
use clap::Parser;
use color_eyre::Result;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::cli::{Command, ConfigCommand, KeyringCommand};

/// Entry point wiring the CLI to the credential operations.
fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing();

    let cli = cli::Cli::parse();
    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => config::default_path()?,
    };
    let config =
        config::load_from_path(&config_path)?.with_env_overrides(|name| std::env::var(name).ok());
    let keyring = KeyringProvider::new(storage::KEYRING_SERVICE);

    match cli.command {
        Command::Add { store, key, value } => {
            let locator = build_locator(&config, &store, &keyring)?;
            let (outcome, file) = commands::add(&locator, &store, key, value, &config)?;
            println!("Stored {} in {}", outcome.identifier, file.display());
        }
        Command::Remove { store, key } => {
            let locator = build_locator(&config, &store, &keyring)?;
            let removed = commands::remove(&locator, &store, key, &config)?;
            println!("Removed {removed} entries");
        }
        Command::Get { store, key } => {
            let locator = build_locator(&config, &store, &keyring)?;
            match commands::get(&locator, &store, key, &config)? {
                Some(value) => println!("{value}"),
                None => color_eyre::eyre::bail!("no credentials stored for that key"),
            }
        }
        Command::List { store, json } => {
            let locator = build_locator(&config, &store, &keyring)?;
            let listing = commands::list(&locator, &store)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&listing)?);
            } else {
                for identifier in &listing.identifiers {
                    println!("{identifier}");
                }
            }
        }
        Command::Config(ConfigCommand::Init) => init_config(&config, &config_path)?,
        Command::Keyring(cmd) => handle_keyring(cmd, &keyring)?,
        Command::Version => print_version(),
    }

    Ok(())
}

fn init_tracing() {
    // Respect user-provided filters, default to info. Logs go to stderr so
    // `get` output stays clean on stdout.
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

fn build_locator(
    config: &config::Config,
    args: &cli::StoreArgs,
    keyring: &dyn PassphraseProvider,
) -> Result<storage::FileLocator> {
    let ambient = settings::ambient_selection(config, args, keyring)?;
    storage::production_locator(ambient)
}

fn print_version() {
    println!("buildcreds {}", env!("CARGO_PKG_VERSION"));
}

fn init_config(config: &config::Config, path: &Path) -> Result<()> {
    let path = config::write_default_if_missing(config, path)?;
    println!("Config initialized at {}", path.display());
    Ok(())
}

fn handle_keyring(cmd: KeyringCommand, keyring: &dyn PassphraseProvider) -> Result<()> {
    match cmd {
        KeyringCommand::Set { env, pass } => {
            keyring.store(env.as_deref(), &pass)?;
            info!(env = env.as_deref().unwrap_or("default"), "stored passphrase in keyring");
            println!("Passphrase stored");
        }
        KeyringCommand::Clear { env } => {
            if keyring.clear(env.as_deref())? {
                println!("Passphrase removed");
            } else {
                println!("No passphrase stored");
            }
        }
    }
    Ok(())
}
