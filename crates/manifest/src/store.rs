use crate::entry::ManifestEntry;
use crate::error::{ErrorKind, Result};
use crate::{TIMESTAMP_FORMAT, write_atomic};
use exn::ResultExt;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fs;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use tracing::instrument;

/// How [`Manifest::write`] persists the document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOptions {
    /// Two-space indented output instead of the compact form.
    pub indent: bool,
    /// Replace the file the manifest was loaded from. Otherwise a timestamped
    /// sibling is written and the original is left as it was.
    pub overwrite: bool,
}

/// Checksum → [`ManifestEntry`], bound to the file it was loaded from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    path: PathBuf,
    entries: BTreeMap<String, ManifestEntry>,
}

impl Manifest {
    /// An empty manifest that will be written to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), entries: BTreeMap::new() }
    }

    /// Load the manifest at `path`, creating an empty document (and its
    /// parent directories) first if nothing exists there yet.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::info!("Manifest does not exist; creating");
            write_atomic(path, b"{}")?;
        }
        let contents = fs::read(path).or_raise(|| ErrorKind::Io(path.to_path_buf()))?;
        let entries = serde_json::from_slice(&contents).or_raise(|| ErrorKind::Format(path.to_path_buf()))?;
        let manifest = Self { path: path.to_path_buf(), entries };
        tracing::debug!(entries = manifest.len(), "Loaded manifest");
        Ok(manifest)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of distinct checksums.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, checksum: &str) -> bool {
        self.entries.contains_key(checksum)
    }

    pub fn get(&self, checksum: &str) -> Option<&ManifestEntry> {
        self.entries.get(checksum)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ManifestEntry)> {
        self.entries.iter()
    }

    /// Merge `entry` under `checksum`. Returns `true` if the checksum was not
    /// known before.
    ///
    /// See [`ManifestEntry::merge`] for how an existing entry absorbs the
    /// incoming one.
    pub fn merge(&mut self, checksum: impl Into<String>, entry: ManifestEntry) -> bool {
        match self.entries.entry(checksum.into()) {
            Entry::Vacant(vacant) => {
                vacant.insert(entry);
                true
            },
            Entry::Occupied(mut occupied) => {
                occupied.get_mut().merge(entry);
                false
            },
        }
    }

    /// Merge every entry of `other` into this manifest. Returns how many
    /// checksums were new.
    pub fn absorb(&mut self, other: Manifest) -> usize {
        other.entries.into_iter().map(|(checksum, entry)| usize::from(self.merge(checksum, entry))).sum()
    }

    /// Entries whose file in the library is called `name`.
    pub fn find_by_name<'a>(&'a self, name: &'a str) -> impl Iterator<Item = (&'a String, &'a ManifestEntry)> + 'a {
        self.entries.iter().filter(move |(_, entry)| entry.target.name == name)
    }

    /// How many checksums were seen at `n` different source paths, for every
    /// `n` greater than one.
    pub fn duplicate_histogram(&self) -> BTreeMap<usize, usize> {
        let mut histogram = BTreeMap::new();
        for entry in self.entries.values().filter(|entry| entry.sources.len() > 1) {
            *histogram.entry(entry.sources.len()).or_insert(0) += 1;
        }
        histogram
    }

    /// Persist the manifest, returning the path that was written.
    #[instrument(skip_all, fields(path = %self.path.display(), indent = options.indent, overwrite = options.overwrite))]
    pub fn write(&self, options: WriteOptions) -> Result<PathBuf> {
        let destination =
            if options.overwrite { self.path.clone() } else { self.versioned_path(OffsetDateTime::now_utc())? };
        self.write_to(&destination, options.indent)?;
        Ok(destination)
    }

    /// Persist the manifest to an explicit path, regardless of where it was
    /// loaded from.
    pub fn write_to(&self, path: impl AsRef<Path>, indent: bool) -> Result<()> {
        let path = path.as_ref();
        let contents = self.to_bytes(indent)?;
        write_atomic(path, &contents)?;
        tracing::info!(destination = %path.display(), entries = self.len(), "Manifest written");
        Ok(())
    }

    /// Sibling of the manifest file carrying a timestamp, e.g.
    /// `manifest_2024-01-31_13-45-00.json` for `manifest.json`.
    pub fn versioned_path(&self, at: OffsetDateTime) -> Result<PathBuf> {
        let stamp = at.format(TIMESTAMP_FORMAT).or_raise(|| ErrorKind::Serialize)?;
        let stem = self.path.file_stem().map(|s| s.to_string_lossy()).unwrap_or_default();
        let name = match self.path.extension() {
            Some(ext) => format!("{stem}_{stamp}.{}", ext.to_string_lossy()),
            None => format!("{stem}_{stamp}"),
        };
        Ok(self.path.with_file_name(name))
    }

    fn to_bytes(&self, indent: bool) -> Result<Vec<u8>> {
        if indent {
            serde_json::to_vec_pretty(&self.entries)
        } else {
            serde_json::to_vec(&self.entries)
        }
        .or_raise(|| ErrorKind::Serialize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{SourceRecord, Target};
    use rstest::rstest;
    use time::macros::datetime;

    const CHECKSUM_A: &str = "aaaa";
    const CHECKSUM_B: &str = "bbbb";

    fn entry(source: &str, album: Option<&str>, name: &str) -> ManifestEntry {
        let record = SourceRecord {
            date_taken: Some(datetime!(2020-03-04 10:20:30)),
            album: album.map(String::from),
            ..Default::default()
        };
        ManifestEntry::new(source, record, Target::new("2020-03-04/Unsorted", name))
    }

    #[test]
    fn test_load_creates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("manifest.json");
        let manifest = Manifest::load(&path).unwrap();
        assert!(manifest.is_empty());
        assert_eq!(fs::read_to_string(&path).unwrap(), "{}");
    }

    #[test]
    fn test_load_rejects_malformed_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manifest.json");
        fs::write(&path, "{ not json").unwrap();
        let err = Manifest::load(&path).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Format(_)));
    }

    #[test]
    fn test_merge_new_and_existing() {
        let mut manifest = Manifest::new("manifest.json");
        assert!(manifest.merge(CHECKSUM_A, entry("/in/a.jpg", None, "a.jpg")));
        assert!(!manifest.merge(CHECKSUM_A, entry("/in/copy-of-a.jpg", Some("X"), "copy-of-a.jpg")));
        assert_eq!(manifest.len(), 1);
        let merged = manifest.get(CHECKSUM_A).unwrap();
        assert_eq!(merged.sources.len(), 2);
        assert_eq!(merged.target.name, "a.jpg");
    }

    #[rstest]
    #[case(false)]
    #[case(true)]
    fn test_round_trip(#[case] indent: bool) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manifest.json");
        let mut manifest = Manifest::load(&path).unwrap();
        manifest.merge(CHECKSUM_B, entry("/in/b.jpg", Some("Holiday"), "b.jpg"));
        manifest.merge(CHECKSUM_A, entry("/in/a.jpg", None, "a.jpg"));
        let written = manifest.write(WriteOptions { indent, overwrite: true }).unwrap();
        assert_eq!(written, path);
        assert_eq!(Manifest::load(&path).unwrap(), manifest);
    }

    #[test]
    fn test_identical_data_is_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let mut first = Manifest::new(dir.path().join("first.json"));
        first.merge(CHECKSUM_A, entry("/in/a.jpg", None, "a.jpg"));
        first.merge(CHECKSUM_B, entry("/in/b.jpg", None, "b.jpg"));
        let mut second = Manifest::new(dir.path().join("second.json"));
        second.merge(CHECKSUM_B, entry("/in/b.jpg", None, "b.jpg"));
        second.merge(CHECKSUM_A, entry("/in/a.jpg", None, "a.jpg"));
        first.write(WriteOptions { indent: false, overwrite: true }).unwrap();
        second.write(WriteOptions { indent: false, overwrite: true }).unwrap();
        assert_eq!(fs::read(first.path()).unwrap(), fs::read(second.path()).unwrap());
    }

    #[test]
    fn test_compact_and_indented_formats() {
        let mut manifest = Manifest::new("manifest.json");
        manifest.merge(CHECKSUM_A, ManifestEntry::new("/a", SourceRecord::default(), Target::new("p", "n")));
        let compact = String::from_utf8(manifest.to_bytes(false).unwrap()).unwrap();
        assert_eq!(compact, r#"{"aaaa":{"sources":{"/a":{}},"target":{"path":"p","name":"n"}}}"#);
        let indented = String::from_utf8(manifest.to_bytes(true).unwrap()).unwrap();
        assert!(indented.starts_with("{\n  \"aaaa\": {\n    \"sources\": {"));
    }

    #[test]
    fn test_versioned_path() {
        let manifest = Manifest::new("/library/manifest.json");
        let path = manifest.versioned_path(datetime!(2024-01-31 13:45:00 UTC)).unwrap();
        assert_eq!(path, Path::new("/library/manifest_2024-01-31_13-45-00.json"));
    }

    #[test]
    fn test_write_without_overwrite_preserves_original() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manifest.json");
        let mut manifest = Manifest::load(&path).unwrap();
        manifest.merge(CHECKSUM_A, entry("/in/a.jpg", None, "a.jpg"));
        let written = manifest.write(WriteOptions::default()).unwrap();
        assert_ne!(written, path);
        assert_eq!(fs::read_to_string(&path).unwrap(), "{}");
        assert_eq!(Manifest::load(&written).unwrap().len(), 1);
    }

    #[test]
    fn test_absorb_and_find() {
        let mut ours = Manifest::new("ours.json");
        ours.merge(CHECKSUM_A, entry("/in/a.jpg", None, "a.jpg"));
        let mut theirs = Manifest::new("theirs.json");
        theirs.merge(CHECKSUM_A, entry("/backup/a.jpg", None, "ignored.jpg"));
        theirs.merge(CHECKSUM_B, entry("/backup/b.jpg", None, "b.jpg"));
        assert_eq!(ours.absorb(theirs), 1);
        assert_eq!(ours.len(), 2);
        assert_eq!(ours.find_by_name("a.jpg").count(), 1);
        assert_eq!(ours.find_by_name("ignored.jpg").count(), 0);
    }

    #[test]
    fn test_duplicate_histogram() {
        let mut manifest = Manifest::new("manifest.json");
        manifest.merge(CHECKSUM_A, entry("/1/a.jpg", None, "a.jpg"));
        manifest.merge(CHECKSUM_A, entry("/2/a.jpg", None, "a.jpg"));
        manifest.merge(CHECKSUM_B, entry("/1/b.jpg", None, "b.jpg"));
        manifest.merge("cccc", entry("/1/c.jpg", None, "c.jpg"));
        manifest.merge("cccc", entry("/2/c.jpg", None, "c.jpg"));
        manifest.merge("cccc", entry("/3/c.jpg", None, "c.jpg"));
        assert_eq!(manifest.duplicate_histogram(), BTreeMap::from([(2, 1), (3, 1)]));
    }
}
