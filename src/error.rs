//! Command Error Types
//!
//! Errors that end a command. Per-file failures never end up here: they are
//! logged, reported and reflected in the exit code only.

use derive_more::{Display, Error};

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("could not set up logging")]
    Logging,
    #[display("invalid configuration")]
    Config,
    #[display("invalid arguments: {_0}")]
    Usage(#[error(not(source))] String),
    #[display("could not read or write manifest")]
    Manifest,
    #[display("could not read or write hash database")]
    HashDb,
    #[display("metadata source failed")]
    Metadata,
    #[display("storage error")]
    Storage,
    /// A fatal error ended the run early.
    #[display("run aborted")]
    Aborted,
    #[display("could not write output")]
    Output,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage | Self::Output)
    }
}
