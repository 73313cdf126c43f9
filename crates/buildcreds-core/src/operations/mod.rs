//! Credential operations run against a resolved [`StoreBinding`](crate::StoreBinding).

mod lookup;
mod remove;
mod upsert;

pub use lookup::{get_credential, list_identifiers};
pub use remove::remove_credentials;
pub use upsert::{add_credentials, AddCredentials, UpsertOutcome};

use crate::error::CredentialsError;

/// Replace every character of `value` with `*`, keeping only its length.
pub fn mask_value(value: &str) -> String {
    "*".repeat(value.chars().count())
}

pub(crate) fn required(
    value: Option<String>,
    name: &'static str,
) -> Result<String, CredentialsError> {
    value.ok_or(CredentialsError::MissingArgument { name })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_preserves_character_count() {
        assert_eq!(mask_value("s3cr3t"), "******");
        assert_eq!(mask_value("päss"), "****");
        assert_eq!(mask_value(""), "");
    }
}
