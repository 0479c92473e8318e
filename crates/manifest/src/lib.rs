//! Durable records of what has been imported.
//!
//! The [`Manifest`] maps a content checksum to every source path the content
//! was seen at, plus the single place in the library it was put. It is loaded
//! once when a run starts, only ever grows while the run is going, and is
//! written back once at the end.
//!
//! The [`HashDb`] is the older, flatter record (checksum → one absolute path)
//! kept for the `generate-db` and `verify` flows.
//!
//! Both are plain JSON documents with sorted keys, so writing the same data
//! twice produces byte-identical files.

mod entry;
pub mod error;
mod hashdb;
mod store;

pub use crate::entry::{ManifestEntry, SourceRecord, Target};
pub use crate::hashdb::HashDb;
pub use crate::store::{Manifest, WriteOptions};
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::fs;
use std::io::Write;
use std::path::Path;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

/// Timestamp suffix used for manifest snapshots, hash database backups and
/// run logs: `2024-01-31_13-45-00`.
pub const TIMESTAMP_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]_[hour]-[minute]-[second]");

/// Write `contents` to `path` through a temporary sibling that is renamed
/// into place, so a reader never sees a half-written document.
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).or_raise(|| ErrorKind::Io(parent.to_path_buf()))?;
    }
    let file_name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
    let temporary = path.with_file_name(format!(".{file_name}.tmp"));
    let result = (|| {
        let mut file = fs::File::create(&temporary)?;
        file.write_all(contents)?;
        file.sync_all()?;
        fs::rename(&temporary, path)
    })();
    if result.is_err() {
        _ = fs::remove_file(&temporary);
    }
    result.or_raise(|| ErrorKind::Io(path.to_path_buf()))
}
