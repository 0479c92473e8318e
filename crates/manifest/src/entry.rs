use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use time::PrimitiveDateTime;

time::serde::format_description!(date_taken_format, PrimitiveDateTime, "[year]-[month]-[day]T[hour]:[minute]:[second]");

/// Sparse snapshot of the metadata a source file had when it was imported.
///
/// Only fields that were present are serialized, which keeps the manifest
/// small for libraries with hundreds of thousands of files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRecord {
    #[serde(default, skip_serializing_if = "Option::is_none", with = "date_taken_format::option")]
    pub date_taken: Option<PrimitiveDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub camera_make: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub camera_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}
impl SourceRecord {
    /// Field-wise merge: a value present in `other` replaces ours, an absent
    /// one leaves ours alone.
    pub fn merge(&mut self, other: SourceRecord) {
        macro_rules! take {
            ($($field:ident),+) => {
                $(if other.$field.is_some() {
                    self.$field = other.$field;
                })+
            };
        }
        take!(date_taken, camera_make, camera_model, album, title, origin, city, state, country);
    }
}

/// Where the content of an entry lives inside the library.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Target {
    /// Directory, relative to the library root.
    pub path: String,
    /// File name inside [`path`](Self::path).
    pub name: String,
}
impl Target {
    pub fn new(path: impl Into<String>, name: impl Into<String>) -> Self {
        Self { path: path.into(), name: name.into() }
    }

    /// Path of the file relative to the library root.
    pub fn relative_path(&self) -> PathBuf {
        PathBuf::from(&self.path).join(&self.name)
    }
}

/// Everything known about one piece of content (one checksum).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Absolute source path → metadata seen at that path.
    #[serde(default)]
    pub sources: BTreeMap<String, SourceRecord>,
    pub target: Target,
}
impl ManifestEntry {
    pub fn new(source: impl Into<String>, record: SourceRecord, target: Target) -> Self {
        Self { sources: BTreeMap::from([(source.into(), record)]), target }
    }

    /// Merge another entry for the same content into this one.
    ///
    /// Sources are merged per path (see [`SourceRecord::merge`]), new paths
    /// are added. The target is never replaced: whichever import created the
    /// entry decided where the content lives.
    pub fn merge(&mut self, other: ManifestEntry) {
        for (path, record) in other.sources {
            self.sources.entry(path).or_default().merge(record);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn record(album: Option<&str>, title: Option<&str>) -> SourceRecord {
        SourceRecord {
            album: album.map(String::from),
            title: title.map(String::from),
            ..Default::default()
        }
    }

    #[test]
    fn test_sparse_serialization() {
        let record = SourceRecord {
            date_taken: Some(datetime!(2020-03-04 10:20:30)),
            origin: Some("iphone".into()),
            ..Default::default()
        };
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"date_taken":"2020-03-04T10:20:30","origin":"iphone"}"#);
        let parsed: SourceRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn test_record_merge_incoming_wins() {
        let mut existing = record(Some("Holiday"), Some("Beach"));
        existing.merge(record(None, Some("Sunset")));
        assert_eq!(existing, record(Some("Holiday"), Some("Sunset")));
    }

    #[test]
    fn test_entry_merge_appends_sources_and_keeps_target() {
        let mut entry = ManifestEntry::new("/in/a.jpg", record(Some("A"), None), Target::new("2020", "a.jpg"));
        entry.merge(ManifestEntry::new("/in/b.jpg", record(None, None), Target::new("elsewhere", "b.jpg")));
        entry.merge(ManifestEntry::new("/in/a.jpg", record(None, Some("T")), Target::new("x", "y")));
        assert_eq!(entry.sources.len(), 2);
        assert_eq!(entry.sources["/in/a.jpg"], record(Some("A"), Some("T")));
        assert_eq!(entry.target, Target::new("2020", "a.jpg"));
    }

    #[test]
    fn test_entry_merge_is_idempotent() {
        let incoming = ManifestEntry::new("/in/a.jpg", record(Some("A"), None), Target::new("2020", "a.jpg"));
        let mut once = incoming.clone();
        once.merge(incoming.clone());
        let mut twice = once.clone();
        twice.merge(incoming);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_target_relative_path() {
        let target = Target::new("2020-03-04/Unsorted", "img.jpg");
        assert_eq!(target.relative_path(), PathBuf::from("2020-03-04").join("Unsorted").join("img.jpg"));
    }
}
