use crate::error::{ErrorKind as LibraryErrorKind, Result as LibraryResult};
use crate::update::Changes;
use crate::update::file::{Update, update_file};
use crate::{Context, SIDECAR_FILE_NAME};
use async_stream::stream;
use exn::ResultExt;
use futures::{Stream, StreamExt};
use std::collections::BTreeSet;
use std::path::PathBuf;
use strata_media::MetadataSource;
use strata_storage::BackendHandle;
use strata_storage::backend::{LocalBackend, StorageBackend};

/// Progress events emitted by [`update`].
///
/// [`Started`](Self::Started) comes first and [`Complete`](Self::Complete)
/// last, with one [`Updated`](Self::Updated) (or `Err` item) per file in
/// between.
#[derive(Debug)]
pub enum UpdateEvent {
    Started,
    Updated(Update),
    Complete,
}

/// Streams [`UpdateEvent`]s while applying `changes` to every file in `paths`
/// with [`update_file`].
///
/// `paths` are absolute. Directories stand for every file below them. Each
/// file is updated once, in path order, even if it is named more than once.
/// Failures are surfaced as `Err` items without terminating the stream.
pub fn update<'a, M: MetadataSource>(
    target: &'a BackendHandle,
    extractor: &'a mut M,
    ctx: &'a Context,
    paths: &'a [PathBuf],
    changes: &'a Changes,
) -> impl Stream<Item = LibraryResult<UpdateEvent>> + 'a {
    stream!({
        yield Ok(UpdateEvent::Started);

        let mut files = BTreeSet::new();
        for path in paths {
            if !path.is_dir() {
                files.insert(path.clone());
                continue;
            }
            let directory = match LocalBackend::open("update", path) {
                Ok(directory) => directory,
                Err(e) => {
                    yield Err(e).or_raise(|| LibraryErrorKind::Storage);
                    continue;
                },
            };
            let mut listing = directory.list_stream();
            while let Some(listed) = listing.next().await {
                match listed.and_then(|info| directory.absolute(&info.path)) {
                    Ok(file) if file.file_name().is_some_and(|name| name == SIDECAR_FILE_NAME) => {},
                    Ok(file) => {
                        files.insert(file);
                    },
                    Err(e) => {
                        yield Err(e).or_raise(|| LibraryErrorKind::Storage);
                    },
                }
            }
        }
        tracing::debug!(files = files.len(), "Updating files");

        for file in &files {
            yield update_file(target, extractor, ctx, file, changes).await.map(UpdateEvent::Updated);
        }

        yield Ok(UpdateEvent::Complete);
    })
}
