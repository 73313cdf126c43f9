use std::path::PathBuf;

use buildcreds_core::{
    locator::FactoryBinding,
    operations::{self, AddCredentials, UpsertOutcome},
    CredentialsError, CredentialsPersistence, StoreFactory, StoreLocator,
};
use color_eyre::Result;
use serde::Serialize;

use crate::{cli::StoreArgs, config::Config, settings};

/// Default binding from the ambient configuration with the command-line
/// overrides applied on top.
pub fn bind<F: StoreFactory>(
    locator: &StoreLocator<F>,
    args: &StoreArgs,
) -> Result<FactoryBinding<F>> {
    Ok(locator.bind(&settings::explicit_selection(args))?)
}

/// Add or update one credential; returns what changed and the store file.
pub fn add<F: StoreFactory>(
    locator: &StoreLocator<F>,
    args: &StoreArgs,
    key: Option<String>,
    value: Option<String>,
    config: &Config,
) -> Result<(UpsertOutcome, PathBuf)> {
    let request = AddCredentials {
        key: settings::or_configured(key, &config.key),
        value: settings::or_configured(value, &config.value),
        hashed_keys: settings::hashed_keys(args, config),
    };
    // Checked before binding so a bad invocation never derives keys or touches disk.
    request.validate()?;

    let binding = bind(locator, args)?;
    let outcome = operations::add_credentials(&binding, request)?;
    Ok((outcome, binding.persistence().credentials_file().to_path_buf()))
}

pub fn remove<F: StoreFactory>(
    locator: &StoreLocator<F>,
    args: &StoreArgs,
    key: Option<String>,
    config: &Config,
) -> Result<usize> {
    let key = settings::or_configured(key, &config.key)
        .ok_or(CredentialsError::MissingArgument { name: "key" })?;
    let binding = bind(locator, args)?;
    Ok(operations::remove_credentials(&binding, Some(key))?)
}

pub fn get<F: StoreFactory>(
    locator: &StoreLocator<F>,
    args: &StoreArgs,
    key: Option<String>,
    config: &Config,
) -> Result<Option<String>> {
    let key = settings::or_configured(key, &config.key)
        .ok_or(CredentialsError::MissingArgument { name: "key" })?;
    let binding = bind(locator, args)?;
    let hashed_keys = settings::hashed_keys(args, config);
    Ok(operations::get_credential(&binding, Some(key), hashed_keys)?)
}

/// Identifiers of one store, as printed by `list --json`.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct Listing {
    pub file: PathBuf,
    pub identifiers: Vec<String>,
}

pub fn list<F: StoreFactory>(locator: &StoreLocator<F>, args: &StoreArgs) -> Result<Listing> {
    let binding = bind(locator, args)?;
    let identifiers = operations::list_identifiers(&binding)?;
    Ok(Listing {
        file: binding.persistence().credentials_file().to_path_buf(),
        identifiers,
    })
}
