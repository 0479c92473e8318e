//! Error types for the [`import`](super) module.
//!
//! Raised as children of [`Import`](crate::error::ErrorKind::Import), which
//! names the file.

use derive_more::{Display, Error};

/// An import error with automatic location tracking via [`exn::Exn`].
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for import operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Why a single file could not be imported.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The source file disappeared between listing and importing.
    #[display("source file does not exist")]
    NotFound,
    /// The extension is not one of the supported media kinds.
    #[display("unsupported file type `{_0}`")]
    Unsupported(#[error(not(source))] String),
    /// The metadata source returned nothing for this file.
    #[display("no metadata for file")]
    MissingMetadata,
    /// The source file could not be read to compute its checksum.
    #[display("could not compute checksum")]
    Checksum,
    /// Placing the file in the library failed.
    #[display("could not place file in library")]
    Storage,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Checksum | Self::Storage)
    }
}
