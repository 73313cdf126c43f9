use std::path::PathBuf;

use thiserror::Error;

use crate::crypto::CryptoError;

/// Terminal failures of a credential operation.
///
/// None of these carry a plaintext credential value.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CredentialsError {
    /// A required invocation argument (`key` or `value`) was not supplied.
    #[error("credentials {name} must not be null")]
    MissingArgument { name: &'static str },
    /// The store exists but could not be read or decoded.
    #[error("failed to read credentials from {}: {reason}", .path.display())]
    Read { path: PathBuf, reason: String },
    /// The store could not be replaced; the previous contents are intact.
    #[error("failed to write credentials to {}: {reason}", .path.display())]
    Write { path: PathBuf, reason: String },
    #[error("failed to lock credentials file {}: {reason}", .path.display())]
    Lock { path: PathBuf, reason: String },
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}
