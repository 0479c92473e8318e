//! Bringing files from a source tree into the library.
//!
//! Every file is identified by its [checksum](strata_storage::checksum) and
//! recorded in the [`Manifest`](strata_manifest::Manifest) under it, together
//! with the metadata it was found with. Content the manifest already knows is
//! recorded again (so every source path is known) but not placed again,
//! unless duplicates are explicitly allowed.
//!
//! The primary entry point is [`import`], which walks a source backend in
//! batches and streams one [`ImportEvent`] per file via [`import_file`].

pub mod error;
mod file;
mod stream;

pub use self::file::{Action, Import, ImportOptions, import_file};
pub use self::stream::{ImportEvent, import};
