//! Library Error Types
//!
//! Operations on a single file raise a kind carrying that file's path, so a
//! report can name it without walking the error tree. The cause (missing
//! file, checksum failure, collision...) is the child frame.

use derive_more::{Display, Error};
use std::path::{Path, PathBuf};

/// A library error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The folder path pattern could not be compiled.
    #[display("invalid folder path pattern")]
    Pattern,
    /// A single file could not be imported; the run continues.
    #[display("failed to import {}", _0.display())]
    Import(#[error(not(source))] PathBuf),
    /// A single file could not be updated; the run continues.
    #[display("failed to update {}", _0.display())]
    Update(#[error(not(source))] PathBuf),
    /// A single file could not be recorded or verified against the hash database.
    #[display("failed to audit {}", _0.display())]
    Audit(#[error(not(source))] PathBuf),
    /// The metadata source failed for a whole batch. Fatal for the run.
    #[display("metadata extraction failed")]
    Metadata,
    /// A storage backend could not be listed.
    #[display("storage error")]
    Storage,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage)
    }

    /// Whether the run has to stop: per-file failures never stop it.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Pattern | Self::Metadata)
    }

    /// The file this error is about, if it is about a single file.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Import(path) | Self::Update(path) | Self::Audit(path) => Some(path),
            _ => None,
        }
    }
}
