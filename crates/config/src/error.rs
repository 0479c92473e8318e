//! Configuration Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A configuration error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for configuration operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Every variant is fatal: a run must not start with a bad configuration.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("configuration file does not exist: {}", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    #[display("configuration file must be JSON: {}", _0.display())]
    NotJson(#[error(not(source))] PathBuf),
    #[display("configuration could not be parsed")]
    Parse,
    #[display("configuration is missing a value for `{_0}`")]
    Missing(#[error(not(source))] &'static str),
    #[display("configuration value for `{field}` is invalid: {reason}")]
    Invalid { field: &'static str, reason: String },
    #[display("could not determine the home directory")]
    NoHomeDirectory,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
