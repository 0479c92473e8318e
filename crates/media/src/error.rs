//! Media Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A media error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for media operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The metadata helper could not be found on this system.
    #[display("metadata helper not installed: {}", _0.display())]
    NotInstalled(#[error(not(source))] PathBuf),
    /// The metadata helper could not be started.
    #[display("could not start the metadata helper")]
    Spawn,
    /// Talking to the metadata helper failed (broken pipe, unexpected exit).
    #[display("lost communication with the metadata helper")]
    Io,
    /// The metadata helper answered with something that could not be parsed.
    #[display("unexpected response from the metadata helper")]
    Protocol,
    /// The metadata helper did not answer in time.
    #[display("metadata helper did not respond within {_0:?}")]
    Timeout(#[error(not(source))] std::time::Duration),
    /// An earlier failure left the helper in an unknown state; it is no
    /// longer used.
    #[display("metadata helper is no longer usable")]
    Closed,
    /// Writing tags to a file was refused.
    #[display("could not write metadata to {}", _0.display())]
    WriteRejected(#[error(not(source))] PathBuf),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}
