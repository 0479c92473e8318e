//! [`StorageBackend`]: one directory tree, either a source that media is read
//! from or the library that media is placed into.

mod local;

pub use self::local::LocalBackend;
use crate::error::Result;
use crate::file::FileInfo;
use async_trait::async_trait;
use futures::Stream;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use time::OffsetDateTime;

type FileInfoStream<'a> = Pin<Box<dyn Stream<Item = Result<FileInfo>> + Send + 'a>>;

/// How a file gets into the library.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Transfer {
    /// Leave the source untouched.
    #[default]
    Copy,
    /// Remove the source once the destination is complete, preserving the
    /// source's access and modification times.
    Move,
}

/// Operations on a directory tree.
///
/// # Paths
/// Paths inside the tree are relative to its root and go through
/// [`validate_path`](crate::validate_path) before use. Paths of files
/// elsewhere (the `from` of [`place()`](Self::place) and
/// [`discard()`](Self::discard), the `dir` of [`prune()`](Self::prune)) are
/// absolute.
///
/// # Examples
///
/// ```
/// use futures::StreamExt;
/// # use strata_storage::{backend::StorageBackend, error::Result};
/// # async fn example(backend: &dyn StorageBackend) -> Result<()> {
/// let mut files = backend.list_stream();
/// while let Some(info) = files.next().await {
///     let info = info?;
///     println!("{} {}", backend.checksum(&info.path).await?, info.path.display());
/// }
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Absolute root directory of the backend.
    fn root(&self) -> &Path;

    /// Resolve a relative path to an absolute one, rejecting anything that
    /// would escape the root.
    fn absolute(&self, path: &Path) -> Result<PathBuf>;

    /// Every regular file below the root, depth first. An unreadable entry is
    /// yielded as an `Err` item and the walk goes on.
    fn list_stream(&self) -> FileInfoStream<'_>;

    /// Content checksum of a file inside the backend, see [`checksum()`](crate::checksum).
    async fn checksum(&self, path: &Path) -> Result<String>;

    /// Place the file at absolute path `from` at the relative path `to`.
    ///
    /// # Notes
    /// - Parent directories are created as needed.
    /// - Never overwrites: returns [`AlreadyExists`](crate::error::ErrorKind::AlreadyExists)
    ///   if `to` is occupied. Resolving collisions is the caller's job.
    /// - A partially written file never appears under the name `to`.
    async fn place(&self, from: &Path, to: &Path, transfer: Transfer) -> Result<()>;

    /// Delete the file at absolute path `from` that was going to be placed,
    /// but turned out to be redundant.
    async fn discard(&self, from: &Path) -> Result<()>;

    /// Set the modification time of a file inside the backend.
    async fn set_modified(&self, path: &Path, modified: OffsetDateTime) -> Result<()>;

    /// Remove the absolute directory `dir` if it is empty, then its parent,
    /// and so on for at most `levels` directories. Only directories strictly
    /// inside the root are ever removed. Returns the directories that were
    /// removed.
    async fn prune(&self, dir: &Path, levels: usize) -> Result<Vec<PathBuf>>;
}
