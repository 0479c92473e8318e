//! The hash database: which file holds which content.
//!
//! [`rebuild`] records the checksum of every file below a directory;
//! [`verify`] checks that every recorded file still exists and still has the
//! recorded content.

use crate::error::{ErrorKind as LibraryErrorKind, Result as LibraryResult};
use async_stream::stream;
use exn::ResultExt;
use futures::{Stream, StreamExt};
use std::path::PathBuf;
use strata_manifest::HashDb;
use strata_storage::BackendHandle;

/// Progress events emitted by [`rebuild`] and [`verify`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditEvent {
    Started,
    /// `path` was recorded in the database with `checksum`.
    Recorded { path: PathBuf, checksum: String },
    /// `path` was checked; `ok` if it exists with the recorded content.
    Verified { path: PathBuf, ok: bool },
    Complete,
}

/// Record every file of `source` in `db`, by absolute path.
///
/// The database is only modified in memory; [resetting](HashDb::reset) it
/// beforehand and [writing](HashDb::write) it afterwards is up to the caller.
pub fn rebuild<'a>(source: &'a BackendHandle, db: &'a mut HashDb) -> impl Stream<Item = LibraryResult<AuditEvent>> + 'a {
    stream!({
        yield Ok(AuditEvent::Started);

        let mut listing = source.list_stream();
        while let Some(listed) = listing.next().await {
            let info = match listed {
                Ok(info) => info,
                Err(e) => {
                    yield Err(e).or_raise(|| LibraryErrorKind::Storage);
                    continue;
                },
            };
            let path = source.root().join(&info.path);
            match source.checksum(&info.path).await {
                Ok(checksum) => {
                    db.insert(checksum.clone(), path.clone());
                    yield Ok(AuditEvent::Recorded { path, checksum });
                },
                Err(e) => {
                    yield Err(e).or_raise(|| LibraryErrorKind::Audit(path));
                },
            }
        }

        yield Ok(AuditEvent::Complete);
    })
}

/// Check every record of `db` against the filesystem.
///
/// A missing file, or one whose content changed, is reported as not `ok`.
/// A file that exists but cannot be read is an `Err` item.
pub fn verify(db: &HashDb) -> impl Stream<Item = LibraryResult<AuditEvent>> + '_ {
    stream!({
        yield Ok(AuditEvent::Started);

        for (expected, path) in db.iter() {
            if !tokio::fs::try_exists(path).await.unwrap_or(false) {
                yield Ok(AuditEvent::Verified { path: path.clone(), ok: false });
                continue;
            }
            match strata_storage::checksum(path).await {
                Ok(actual) => {
                    yield Ok(AuditEvent::Verified { path: path.clone(), ok: &actual == expected });
                },
                Err(e) => {
                    yield Err(e).or_raise(|| LibraryErrorKind::Audit(path.clone()));
                },
            }
        }

        yield Ok(AuditEvent::Complete);
    })
}
