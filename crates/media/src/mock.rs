//! Metadata source for testing, without ExifTool.

use crate::error::{ErrorKind, Result};
use crate::metadata::{MediaMetadata, format_exif_datetime};
use crate::source::{MetadataBatch, MetadataSource, TagUpdate};
use async_trait::async_trait;
use exn::{OptionExt, ResultExt};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Metadata source for testing.
///
/// Metadata for a path comes from, in order:
/// 1. an entry registered with [`with()`](Self::with);
/// 2. the file itself, when its whole content is a JSON object of grouped
///    tags in ExifTool's output format (`{"EXIF:Model": "iPhone 11"}`);
/// 3. the file name alone.
///
/// Writes rewrite that JSON object in place, so (as with real embedded
/// metadata) tags travel with the file when it is moved, and writing changes
/// the file's checksum.
///
/// # Examples
///
/// ```
/// use strata_media::{MediaMetadata, MetadataSource, StaticSource};
/// use std::path::PathBuf;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let photo = PathBuf::from("/media/in/IMG_0001.JPG");
/// let mut source = StaticSource::default().with(&photo, MediaMetadata {
///     origin: Some("iphone".into()),
///     ..MediaMetadata::from_path(&photo)
/// });
/// let batch = source.extract(&[photo.clone()]).await.unwrap();
/// assert_eq!(batch[&photo].origin.as_deref(), Some("iphone"));
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    registered: HashMap<PathBuf, MediaMetadata>,
    writes: Vec<(PathBuf, Vec<TagUpdate>)>,
    failing: bool,
}

impl StaticSource {
    /// A source whose every batch comes back empty, as if the helper had
    /// crashed.
    pub fn failing() -> Self {
        Self { failing: true, ..Default::default() }
    }

    pub fn with(mut self, path: impl Into<PathBuf>, metadata: MediaMetadata) -> Self {
        self.registered.insert(path.into(), metadata);
        self
    }

    /// Every write performed so far, in order.
    pub fn writes(&self) -> &[(PathBuf, Vec<TagUpdate>)] {
        &self.writes
    }

    async fn read_tags(path: &Path) -> Option<Map<String, Value>> {
        let contents = tokio::fs::read(path).await.ok()?;
        match serde_json::from_slice(&contents).ok()? {
            Value::Object(tags) => Some(tags),
            _ => None,
        }
    }
}

#[async_trait]
impl MetadataSource for StaticSource {
    async fn extract(&mut self, paths: &[PathBuf]) -> Result<MetadataBatch> {
        if self.failing {
            return Ok(MetadataBatch::new());
        }
        let mut batch = MetadataBatch::with_capacity(paths.len());
        for path in paths {
            let metadata = match self.registered.get(path) {
                Some(metadata) => metadata.clone(),
                None => match Self::read_tags(path).await {
                    Some(tags) => MediaMetadata::from_exiftool(path, &Value::Object(tags)),
                    None => MediaMetadata::from_path(path),
                },
            };
            batch.insert(path.clone(), metadata);
        }
        Ok(batch)
    }

    async fn write(&mut self, path: &Path, updates: &[TagUpdate]) -> Result<()> {
        let mut tags = Self::read_tags(path).await.ok_or_raise(|| ErrorKind::WriteRejected(path.to_path_buf()))?;
        for update in updates {
            match update {
                TagUpdate::Album(album) => {
                    tags.insert("XMP:Album".into(), album.as_str().into());
                },
                TagUpdate::Title(title) => {
                    tags.insert("XMP:Title".into(), title.as_str().into());
                },
                TagUpdate::DateTaken(date) => {
                    tags.insert("EXIF:DateTimeOriginal".into(), format_exif_datetime(*date).into());
                },
                TagUpdate::Location(coordinates) => {
                    tags.insert("Composite:GPSLatitude".into(), coordinates.latitude.into());
                    tags.insert("Composite:GPSLongitude".into(), coordinates.longitude.into());
                },
            }
        }
        let contents = serde_json::to_vec(&tags).or_raise(|| ErrorKind::Protocol)?;
        tokio::fs::write(path, contents).await.or_raise(|| ErrorKind::WriteRejected(path.to_path_buf()))?;
        if let Some(registered) = self.registered.remove(path) {
            // Registered metadata would otherwise shadow what was just written.
            let written = MediaMetadata::from_exiftool(path, &Value::Object(tags));
            self.registered.insert(path.to_path_buf(), MediaMetadata { base_name: registered.base_name, ..written });
        }
        self.writes.push((path.to_path_buf(), updates.to_vec()));
        Ok(())
    }

    async fn shutdown(self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[tokio::test]
    async fn test_reads_and_writes_tags_in_file() {
        let dir = tempfile::tempdir().unwrap();
        let photo = dir.path().join("IMG_0001.jpg");
        std::fs::write(&photo, r#"{"EXIF:Model":"iPhone 11"}"#).unwrap();
        let plain = dir.path().join("notes.txt");
        std::fs::write(&plain, "just text").unwrap();

        let mut source = StaticSource::default();
        let batch = source.extract(&[photo.clone(), plain.clone()]).await.unwrap();
        assert_eq!(batch[&photo].camera_model.as_deref(), Some("iPhone 11"));
        assert_eq!(batch[&plain], MediaMetadata::from_path(&plain));

        let updates = [TagUpdate::Title("Beach Day".into()), TagUpdate::DateTaken(datetime!(2021-06-01 12:00:00))];
        source.write(&photo, &updates).await.unwrap();
        let batch = source.extract(std::slice::from_ref(&photo)).await.unwrap();
        assert_eq!(batch[&photo].title.as_deref(), Some("Beach Day"));
        assert_eq!(batch[&photo].date_taken, Some(datetime!(2021-06-01 12:00:00)));
        assert_eq!(source.writes().len(), 1);

        assert!(source.write(&plain, &updates).await.is_err());
    }

    #[tokio::test]
    async fn test_failing_source_returns_nothing() {
        let mut source = StaticSource::failing();
        assert!(source.extract(&[PathBuf::from("/a.jpg")]).await.unwrap().is_empty());
    }
}
