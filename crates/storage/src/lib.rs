//! Filesystem storage for the media library.
//!
//! Provides the content [`checksum`] used to identify files, [path
//! validation](validate_path) for library-relative paths, and the
//! [`StorageBackend`] abstraction over the directory trees files are read
//! from (sources) and placed into (targets).

pub mod backend;
mod checksum;
pub mod error;
pub mod file;
mod path;

pub use crate::backend::{StorageBackend, Transfer};
pub use crate::checksum::{BLOCK_SIZE, checksum, checksum_reader};
pub use crate::path::validate as validate_path;
use std::sync::Arc;

pub type BackendHandle = Arc<dyn StorageBackend + Send + Sync>;
