use crate::error::{ErrorKind, Result};
use crate::{TIMESTAMP_FORMAT, write_atomic};
use exn::ResultExt;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use tracing::instrument;

/// Checksum → the one absolute path the content was last seen at.
///
/// Lives at a well-known location (see `strata_config::Settings::hash_db`).
/// Unlike the [`Manifest`](crate::Manifest), later inserts simply replace
/// earlier ones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HashDb {
    path: PathBuf,
    entries: BTreeMap<String, PathBuf>,
}

impl HashDb {
    /// Load the database at `path`; a missing file is an empty database.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let entries = match fs::read(path) {
            Ok(contents) => serde_json::from_slice(&contents).or_raise(|| ErrorKind::Format(path.to_path_buf()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e).or_raise(|| ErrorKind::Io(path.to_path_buf())),
        };
        Ok(Self { path: path.to_path_buf(), entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, checksum: &str) -> bool {
        self.entries.contains_key(checksum)
    }

    pub fn get(&self, checksum: &str) -> Option<&Path> {
        self.entries.get(checksum).map(PathBuf::as_path)
    }

    pub fn insert(&mut self, checksum: impl Into<String>, path: impl Into<PathBuf>) {
        self.entries.insert(checksum.into(), path.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &PathBuf)> {
        self.entries.iter()
    }

    /// Forget everything. Nothing is written until [`write()`](Self::write).
    pub fn reset(&mut self) {
        self.entries.clear();
    }

    /// Copy the file on disk to `<path>-<timestamp>`. Returns `None` when
    /// there was nothing on disk to back up.
    pub fn backup(&self) -> Result<Option<PathBuf>> {
        self.backup_at(OffsetDateTime::now_utc())
    }

    fn backup_at(&self, at: OffsetDateTime) -> Result<Option<PathBuf>> {
        if !self.path.is_file() {
            return Ok(None);
        }
        let stamp = at.format(TIMESTAMP_FORMAT).or_raise(|| ErrorKind::Serialize)?;
        let mut backup = self.path.clone().into_os_string();
        backup.push(format!("-{stamp}"));
        let backup = PathBuf::from(backup);
        fs::copy(&self.path, &backup).or_raise(|| ErrorKind::Io(backup.clone()))?;
        tracing::info!(backup = %backup.display(), "Backed up hash database");
        Ok(Some(backup))
    }

    /// Persist the database, creating the application directory if needed.
    pub fn write(&self) -> Result<()> {
        let contents = serde_json::to_vec(&self.entries).or_raise(|| ErrorKind::Serialize)?;
        write_atomic(&self.path, &contents)?;
        tracing::debug!(path = %self.path.display(), entries = self.len(), "Hash database written");
        Ok(())
    }
}
