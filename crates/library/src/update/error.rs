//! Error types for the [`update`](super) module.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// An update error with automatic location tracking via [`exn::Exn`].
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for update operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("file does not exist")]
    NotFound,
    /// Only files below the library root are updated.
    #[display("{} is not inside the library", _0.display())]
    OutsideLibrary(#[error(not(source))] PathBuf),
    #[display("unsupported file type `{_0}`")]
    Unsupported(#[error(not(source))] String),
    /// Not `YYYY-MM-DD` nor `YYYY-MM-DD HH:MM:SS`.
    #[display("invalid time `{_0}`")]
    InvalidTime(#[error(not(source))] String),
    /// Reading or writing the embedded metadata failed.
    #[display("could not read or write metadata")]
    Metadata,
    #[display("could not compute checksum")]
    Checksum,
    /// Moving the file to its new location failed.
    #[display("could not move file")]
    Storage,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Checksum | Self::Storage)
    }
}
