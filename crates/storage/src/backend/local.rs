//! A directory tree on the local disk: a camera card, a download folder, or
//! the library itself.

use crate::backend::{FileInfoStream, Transfer};
use crate::error::ErrorKind;
use crate::file::FileInfo;
use crate::{StorageBackend, error::Result, path::validate as validate_path};
use async_stream::stream;
use async_trait::async_trait;
use exn::ResultExt;
use filetime::FileTime;
use std::fs::{Metadata, create_dir_all as sync_create_dir};
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use tokio::fs::{self, DirEntry};

/// Suffix of the temporary sibling a copy is written to before being renamed
/// into place.
const PARTIAL_SUFFIX: &str = ".partial";

enum WalkEntry {
    File(FileInfo),
    Descend(PathBuf),
    Skip,
}

/// A directory tree on the local disk. Paths handed to it are relative to `root`.
///
/// # Examples
///
/// ```no_run
/// use strata_storage::backend::LocalBackend;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let library = LocalBackend::new("library", "/path/to/library")?;
/// let camera = LocalBackend::open("source", "/media/sdcard/DCIM")?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct LocalBackend {
    name: String,
    /// Root directory for the backend
    root: PathBuf,
}
impl LocalBackend {
    /// Create a new local filesystem backend, creating the root directory if
    /// it does not exist yet (libraries start out empty).
    ///
    /// # Errors
    ///
    /// Returns an error if the path is not absolute, or exists but is not a
    /// directory.
    pub fn new(name: impl Into<String>, root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_absolute() {
            exn::bail!(ErrorKind::InvalidPath(root));
        }
        if root.exists() {
            if !root.is_dir() {
                exn::bail!(ErrorKind::InvalidPath(root));
            }
        } else {
            // Use non-async here; it'll only happen once on initialization
            // and it's not worth the hassle of making the constructor async.
            sync_create_dir(&root).map_err(|e| ErrorKind::from_io(e, &root))?;
        }
        Ok(Self { name: name.into(), root })
    }

    /// Open an existing directory tree (a source to import from).
    ///
    /// Unlike [`new()`](Self::new) a missing directory is an error.
    pub fn open(name: impl Into<String>, root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_absolute() {
            exn::bail!(ErrorKind::InvalidPath(root));
        }
        if !root.is_dir() {
            exn::bail!(ErrorKind::NotFound(root));
        }
        Ok(Self { name: name.into(), root })
    }

    /// Get the absolute path for a relative storage path.
    ///
    /// Validates the path and joins it with the root directory.
    fn absolute_path(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let validated = validate_path(path.as_ref())?;
        Ok(self.root.join(validated))
    }

    /// Convert an absolute path back to a relative storage path.
    fn relative_path(&self, absolute: impl AsRef<Path>) -> Result<PathBuf> {
        let absolute = absolute.as_ref();
        if !absolute.is_absolute() {
            exn::bail!(ErrorKind::InvalidPath(absolute.to_path_buf()));
        }
        let relative =
            absolute.strip_prefix(&self.root).or_raise(|| ErrorKind::OutsideRoot(absolute.to_path_buf()))?;
        validate_path(relative)
    }

    fn metadata(path: &Path, metadata: Metadata) -> Result<FileInfo> {
        let modified = metadata.modified().map_err(ErrorKind::Io)?.into();
        Ok(FileInfo::new(PathBuf::from(path), metadata.len(), modified))
    }

    fn partial_path(destination: &Path) -> PathBuf {
        let mut name = std::ffi::OsString::from(".");
        name.push(destination.file_name().unwrap_or_default());
        name.push(PARTIAL_SUFFIX);
        destination.with_file_name(name)
    }

    /// Copy `from` to `to` through a temporary sibling, so that `to` only ever
    /// exists once it is complete.
    async fn copy_complete(from: &Path, to: &Path) -> Result<()> {
        let partial = Self::partial_path(to);
        if let Err(e) = fs::copy(from, &partial).await {
            _ = fs::remove_file(&partial).await;
            exn::bail!(ErrorKind::from_io(e, from));
        }
        if let Err(e) = fs::rename(&partial, to).await {
            _ = fs::remove_file(&partial).await;
            exn::bail!(ErrorKind::from_io(e, to));
        }
        Ok(())
    }

    /// Move `from` to `to`, falling back to copy-and-delete when the two live
    /// on different filesystems. Access and modification times survive either way.
    async fn move_preserving_times(from: &Path, to: &Path) -> Result<()> {
        let metadata = fs::metadata(from).await.map_err(|e| ErrorKind::from_io(e, from))?;
        let accessed = FileTime::from_last_access_time(&metadata);
        let modified = FileTime::from_last_modification_time(&metadata);
        match fs::rename(from, to).await {
            Ok(()) => {},
            Err(e) if e.kind() == IoErrorKind::CrossesDevices => {
                Self::copy_complete(from, to).await?;
                fs::remove_file(from).await.map_err(|e| ErrorKind::from_io(e, from))?;
            },
            Err(e) => exn::bail!(ErrorKind::from_io(e, from)),
        }
        filetime::set_file_times(to, accessed, modified).map_err(|e| ErrorKind::from_io(e, to))?;
        Ok(())
    }

    /// What the walk does with one directory entry. Anything that is neither
    /// a directory nor a regular file (a dangling symlink, a socket) is skipped.
    async fn visit(&self, entry: DirEntry) -> Result<WalkEntry> {
        let path = entry.path();
        let metadata = entry.metadata().await.map_err(|e| ErrorKind::from_io(e, &path))?;
        if metadata.is_dir() {
            return Ok(WalkEntry::Descend(path));
        }
        if !metadata.is_file() {
            return Ok(WalkEntry::Skip);
        }
        let relative = self.relative_path(&path)?;
        Ok(WalkEntry::File(Self::metadata(&relative, metadata)?))
    }
}

#[async_trait]
impl StorageBackend for LocalBackend {
    fn root(&self) -> &Path {
        &self.root
    }

    fn absolute(&self, path: &Path) -> Result<PathBuf> {
        self.absolute_path(path)
    }

    fn list_stream(&self) -> FileInfoStream<'_> {
        tracing::debug!(backend = %self.name, root = %self.root.display(), "Listing files");
        let mut pending = vec![self.root.clone()];
        Box::pin(stream! {
            while let Some(dir) = pending.pop() {
                let mut entries = match fs::read_dir(&dir).await {
                    Ok(entries) => entries,
                    // Removed since it was seen; nothing left to list.
                    Err(e) if e.kind() == IoErrorKind::NotFound && dir != self.root => continue,
                    Err(e) => {
                        yield Err(exn::Exn::from(ErrorKind::from_io(e, &dir)));
                        continue;
                    },
                };
                loop {
                    let entry = match entries.next_entry().await {
                        Ok(Some(entry)) => entry,
                        Ok(None) => break,
                        Err(e) => {
                            yield Err(exn::Exn::from(ErrorKind::from_io(e, &dir)));
                            break;
                        },
                    };
                    match self.visit(entry).await {
                        Ok(WalkEntry::File(info)) => yield Ok(info),
                        Ok(WalkEntry::Descend(sub)) => pending.push(sub),
                        Ok(WalkEntry::Skip) => {},
                        Err(e) => yield Err(e),
                    }
                }
            }
        })
    }

    async fn checksum(&self, path: &Path) -> Result<String> {
        let abs_path = self.absolute_path(path)?;
        crate::checksum(abs_path).await
    }

    async fn place(&self, from: &Path, to: &Path, transfer: Transfer) -> Result<()> {
        let to_path = self.absolute_path(to)?;
        if fs::try_exists(&to_path).await.map_err(ErrorKind::Io)? {
            exn::bail!(ErrorKind::AlreadyExists(to.to_path_buf()));
        }
        if let Some(parent) = to_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| ErrorKind::from_io(e, to))?;
        }
        match transfer {
            Transfer::Copy => Self::copy_complete(from, &to_path).await,
            Transfer::Move => Self::move_preserving_times(from, &to_path).await,
        }
    }

    async fn discard(&self, from: &Path) -> Result<()> {
        if !from.is_absolute() {
            exn::bail!(ErrorKind::InvalidPath(from.to_path_buf()));
        }
        Ok(fs::remove_file(from).await.map_err(|e| ErrorKind::from_io(e, from))?)
    }

    async fn set_modified(&self, path: &Path, modified: OffsetDateTime) -> Result<()> {
        let abs_path = self.absolute_path(path)?;
        let mtime = FileTime::from_unix_time(modified.unix_timestamp(), modified.nanosecond());
        Ok(filetime::set_file_mtime(&abs_path, mtime).map_err(|e| ErrorKind::from_io(e, path))?)
    }

    async fn prune(&self, dir: &Path, levels: usize) -> Result<Vec<PathBuf>> {
        let mut removed = Vec::new();
        let mut current = Some(dir);
        for _ in 0..levels {
            let Some(dir) = current else { break };
            if !dir.starts_with(&self.root) || dir == self.root {
                break;
            }
            match fs::remove_dir(dir).await {
                Ok(()) => removed.push(dir.to_path_buf()),
                // Not empty (or already gone): nothing above it can be empty either.
                Err(e) if matches!(e.kind(), IoErrorKind::DirectoryNotEmpty | IoErrorKind::NotFound) => break,
                Err(e) => exn::bail!(ErrorKind::from_io(e, dir)),
            }
            current = dir.parent();
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn write(dir: &Path, relative: &str, data: &[u8]) -> PathBuf {
        let path = dir.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, data).unwrap();
        path
    }

    #[test]
    fn test_new_requires_absolute_path() {
        let temp_dir = tempfile::tempdir().unwrap();
        assert!(LocalBackend::new("name", temp_dir.path()).is_ok());
        assert!(LocalBackend::new("name", "relative/path").is_err());
        assert!(LocalBackend::new("name", "./relative").is_err());
    }

    #[test]
    fn test_open_requires_existing_directory() {
        let temp_dir = tempfile::tempdir().unwrap();
        assert!(LocalBackend::open("source", temp_dir.path()).is_ok());
        let err = LocalBackend::open("source", temp_dir.path().join("missing")).unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[test]
    fn test_absolute_and_relative_path() {
        let temp_dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new("name", temp_dir.path()).unwrap();
        let expected = temp_dir.path().join("2020-03-04/img.jpg");
        assert_eq!(backend.absolute_path(Path::new("2020-03-04/img.jpg")).unwrap(), expected);
        assert_eq!(backend.relative_path(&expected).unwrap(), Path::new("2020-03-04/img.jpg"));
        // Path traversal is prevented
        assert!(backend.absolute_path(Path::new("../etc/passwd")).is_err());
        assert!(backend.relative_path(Path::new("/other/file.jpg")).is_err());
    }

    #[tokio::test]
    async fn test_place_copy_creates_directories() {
        let source = tempfile::tempdir().unwrap();
        let library = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new("library", library.path()).unwrap();
        let from = write(source.path(), "img.jpg", b"pixels");
        backend.place(&from, Path::new("a/b/c/img.jpg"), Transfer::Copy).await.unwrap();
        assert!(from.exists());
        assert_eq!(std::fs::read(library.path().join("a/b/c/img.jpg")).unwrap(), b"pixels");
        assert!(!library.path().join("a/b/c/.img.jpg.partial").exists());
    }

    #[tokio::test]
    async fn test_place_never_overwrites() {
        let source = tempfile::tempdir().unwrap();
        let library = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new("library", library.path()).unwrap();
        let from = write(source.path(), "img.jpg", b"new");
        write(library.path(), "img.jpg", b"old");
        let err = backend.place(&from, Path::new("img.jpg"), Transfer::Copy).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::AlreadyExists(_)));
        assert_eq!(std::fs::read(library.path().join("img.jpg")).unwrap(), b"old");
    }

    #[tokio::test]
    async fn test_place_move_preserves_modified_time() {
        let source = tempfile::tempdir().unwrap();
        let library = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new("library", library.path()).unwrap();
        let from = write(source.path(), "clip.mp4", b"frames");
        let mtime = FileTime::from_unix_time(1_500_000_000, 0);
        filetime::set_file_mtime(&from, mtime).unwrap();
        backend.place(&from, Path::new("2017/clip.mp4"), Transfer::Move).await.unwrap();
        assert!(!from.exists());
        let metadata = std::fs::metadata(library.path().join("2017/clip.mp4")).unwrap();
        assert_eq!(FileTime::from_last_modification_time(&metadata), mtime);
    }

    #[tokio::test]
    async fn test_checksum_matches_free_function() {
        let library = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new("library", library.path()).unwrap();
        let absolute = write(library.path(), "x/img.jpg", b"pixels");
        assert_eq!(
            backend.checksum(Path::new("x/img.jpg")).await.unwrap(),
            crate::checksum(&absolute).await.unwrap()
        );
    }

    #[tokio::test]
    async fn test_set_modified() {
        let library = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new("library", library.path()).unwrap();
        write(library.path(), "img.jpg", b"pixels");
        let when = OffsetDateTime::from_unix_timestamp(1_583_317_230).unwrap();
        backend.set_modified(Path::new("img.jpg"), when).await.unwrap();
        let metadata = std::fs::metadata(library.path().join("img.jpg")).unwrap();
        assert_eq!(FileTime::from_last_modification_time(&metadata).unix_seconds(), 1_583_317_230);
    }

    #[tokio::test]
    async fn test_prune_stops_at_non_empty_and_root() {
        let library = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new("library", library.path()).unwrap();
        std::fs::create_dir_all(library.path().join("a/b/c")).unwrap();
        write(library.path(), "a/keep.jpg", b"x");
        let removed = backend.prune(&library.path().join("a/b/c"), 5).await.unwrap();
        assert_eq!(removed, vec![library.path().join("a/b/c"), library.path().join("a/b")]);
        assert!(library.path().join("a").exists());

        std::fs::create_dir_all(library.path().join("lonely")).unwrap();
        let removed = backend.prune(&library.path().join("lonely"), 5).await.unwrap();
        assert_eq!(removed, vec![library.path().join("lonely")]);
        assert!(library.path().exists());
    }

    #[tokio::test]
    async fn test_prune_is_bounded_by_levels() {
        let library = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new("library", library.path()).unwrap();
        std::fs::create_dir_all(library.path().join("a/b/c")).unwrap();
        let removed = backend.prune(&library.path().join("a/b/c"), 2).await.unwrap();
        assert_eq!(removed.len(), 2);
        assert!(library.path().join("a").exists());
    }

    #[tokio::test]
    async fn test_discard() {
        let source = tempfile::tempdir().unwrap();
        let library = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new("library", library.path()).unwrap();
        let from = write(source.path(), "dup.jpg", b"x");
        backend.discard(&from).await.unwrap();
        assert!(!from.exists());
        assert!(backend.discard(Path::new("relative.jpg")).await.is_err());
    }

    #[tokio::test]
    async fn test_list_walks_every_file() {
        use futures::TryStreamExt;

        let library = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new("library", library.path()).unwrap();
        write(library.path(), "2020/Paris/img1.jpg", b"x");
        write(library.path(), "2020/Paris-Orly/img2.jpg", b"xy");
        write(library.path(), "img3.jpg", b"xyz");
        std::fs::create_dir_all(library.path().join("empty")).unwrap();

        let mut listed: Vec<_> = backend.list_stream().try_collect().await.unwrap();
        listed.sort_by(|a, b| a.path.cmp(&b.path));
        let paths: Vec<_> = listed.iter().map(|info| info.path.clone()).collect();
        assert_eq!(
            paths,
            vec![
                PathBuf::from("2020/Paris-Orly/img2.jpg"),
                PathBuf::from("2020/Paris/img1.jpg"),
                PathBuf::from("img3.jpg"),
            ]
        );
        assert_eq!(listed[0].size, 2);
    }

    #[tokio::test]
    async fn test_prune_never_leaves_the_root() {
        let outside = tempfile::tempdir().unwrap();
        let library = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new("library", library.path()).unwrap();
        std::fs::create_dir_all(outside.path().join("a/b")).unwrap();
        let removed = backend.prune(&outside.path().join("a/b"), 2).await.unwrap();
        assert!(removed.is_empty());
        assert!(outside.path().join("a/b").is_dir());
    }

    #[tokio::test]
    async fn test_path_security() {
        let source = tempfile::tempdir().unwrap();
        let library = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new("library", library.path()).unwrap();
        let from = write(source.path(), "img.jpg", b"x");
        assert!(backend.place(&from, Path::new("../escape.jpg"), Transfer::Copy).await.is_err());
        assert!(backend.checksum(Path::new("etc/../../passwd")).await.is_err());
        assert!(backend.set_modified(Path::new("../../file"), OffsetDateTime::UNIX_EPOCH).await.is_err());
    }
}
