//! Manifest Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A manifest error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for manifest operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// Both loading a corrupt file and failing to persist are fatal to a run:
/// continuing would either lose track of imported files or silently drop
/// the record of what was done.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The file exists but is not a manifest (or hash database) document.
    #[display("not a valid manifest document: {}", _0.display())]
    Format(#[error(not(source))] PathBuf),
    /// Reading, writing, or renaming the file failed.
    #[display("could not access manifest file: {}", _0.display())]
    Io(#[error(not(source))] PathBuf),
    #[display("could not serialize manifest")]
    Serialize,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}
