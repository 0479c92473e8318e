use crate::error::Result;
use crate::metadata::{Coordinates, MediaMetadata, format_exif_datetime};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use time::PrimitiveDateTime;

/// Metadata for every file of a batch that the source could read, keyed by
/// the path exactly as it was requested.
pub type MetadataBatch = HashMap<PathBuf, MediaMetadata>;

/// A change to the metadata embedded in a file.
#[derive(Debug, Clone, PartialEq)]
pub enum TagUpdate {
    Album(String),
    Title(String),
    DateTaken(PrimitiveDateTime),
    Location(Coordinates),
}

impl TagUpdate {
    /// ExifTool assignments performing this update.
    pub fn exiftool_arguments(&self) -> Vec<String> {
        match self {
            Self::Album(album) => vec![format!("-XMP:Album={album}")],
            Self::Title(title) => vec![format!("-XMP:Title={title}")],
            Self::DateTaken(date) => {
                let date = format_exif_datetime(*date);
                vec![
                    format!("-EXIF:DateTimeOriginal={date}"),
                    format!("-EXIF:CreateDate={date}"),
                    format!("-QuickTime:CreateDate={date}"),
                ]
            },
            Self::Location(Coordinates { latitude, longitude }) => vec![
                format!("-GPSLatitude={}", latitude.abs()),
                format!("-GPSLatitudeRef={}", if *latitude < 0.0 { "S" } else { "N" }),
                format!("-GPSLongitude={}", longitude.abs()),
                format!("-GPSLongitudeRef={}", if *longitude < 0.0 { "W" } else { "E" }),
            ],
        }
    }
}

/// Something that reads (and writes) embedded metadata, a batch at a time.
///
/// A source is a scoped resource: create it once per run, feed it batches
/// strictly one after another, then [`shutdown()`](Self::shutdown) on every
/// exit path.
#[async_trait]
pub trait MetadataSource: Send {
    /// Read metadata for every path in `paths`.
    ///
    /// Files the source cannot read are simply missing from the returned
    /// batch. An `Err` means the source itself failed and no further
    /// batches should be attempted.
    async fn extract(&mut self, paths: &[PathBuf]) -> Result<MetadataBatch>;

    /// Write `updates` into the file at `path`, in place.
    async fn write(&mut self, path: &Path, updates: &[TagUpdate]) -> Result<()>;

    /// Total time spent waiting for the source so far.
    fn waiting_time(&self) -> Duration {
        Duration::ZERO
    }

    /// Release the source.
    async fn shutdown(self) -> Result<()>
    where
        Self: Sized;
}
