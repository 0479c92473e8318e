//! Organizing media into a library.
//!
//! - [`import`](mod@import): bring files from a source tree into the library,
//!   recording every one of them in the [manifest](strata_manifest::Manifest).
//! - [`update`](mod@update): change embedded metadata of library files and
//!   move them to wherever their new metadata says they belong.
//! - [`audit`]: build and check the checksum → path [hash database](strata_manifest::HashDb).
//!
//! Where a file belongs is decided by a [`PathPattern`] (its directory) and
//! [`file_name`] (its name), both driven by the file's
//! [`MediaMetadata`](strata_media::MediaMetadata).

pub mod audit;
mod consts;
pub mod error;
pub mod import;
mod naming;
mod pattern;
mod place;
pub mod report;
pub mod update;

pub use crate::naming::{embedded_timestamp, file_name, sanitize_title};
pub use crate::pattern::{InvalidPattern, PathPattern};
use crate::error::Result;
use std::sync::Arc;
use strata_manifest::{SourceRecord, Target};
use strata_media::MediaMetadata;

/// Name of the configuration file that may sit inside a source tree. It is
/// never imported.
pub const SIDECAR_FILE_NAME: &str = "strata.json";

/// Settings shared by every file of a run.
#[derive(Debug, Clone)]
pub struct Context {
    pub pattern: Arc<PathPattern>,
    /// Files per metadata request. Never zero.
    pub batch_size: usize,
}

impl Context {
    pub fn new(pattern: &str, batch_size: usize) -> Result<Self> {
        let pattern = PathPattern::compile(pattern)?;
        if !pattern.is_total() {
            tracing::warn!(
                %pattern,
                "Some pattern segments have no literal or date fallback; files may end up at different depths"
            );
        }
        Ok(Self { pattern, batch_size: batch_size.max(1) })
    }

    /// Where the file described by `metadata` belongs, relative to the library root.
    pub fn target_for(&self, metadata: &MediaMetadata) -> Target {
        Target::new(self.pattern.directory(metadata).to_string_lossy(), file_name(metadata))
    }
}

/// The part of `metadata` worth remembering in the manifest.
pub(crate) fn source_record(metadata: &MediaMetadata) -> SourceRecord {
    SourceRecord {
        date_taken: metadata.date_taken,
        camera_make: metadata.camera_make.clone(),
        camera_model: metadata.camera_model.clone(),
        album: metadata.album.clone(),
        title: metadata.title.clone(),
        origin: metadata.origin.clone(),
        city: metadata.city.clone(),
        state: metadata.state.clone(),
        country: metadata.country.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_target_for() {
        let ctx = Context::new(r#"%date/%album|"Unsorted""#, 0).unwrap();
        assert_eq!(ctx.batch_size, 1);
        let metadata = MediaMetadata {
            date_taken: Some(datetime!(2020-03-04 10:20:30)),
            base_name: "IMG_0001".into(),
            origin: Some("iphone".into()),
            extension: "jpg".into(),
            ..Default::default()
        };
        let target = ctx.target_for(&metadata);
        assert_eq!(target.path, "2020-03-04/Unsorted");
        assert_eq!(target.name, "2020-03-04_10-20-30-iphone-img_0001.jpg");
        assert_eq!(source_record(&metadata).origin.as_deref(), Some("iphone"));
    }
}
