use crate::error::{ErrorKind as LibraryErrorKind, Result as LibraryResult};
use crate::import::file::{Import, ImportOptions, import_file};
use crate::{Context, SIDECAR_FILE_NAME};
use async_stream::stream;
use exn::{Exn, ResultExt};
use futures::{Stream, StreamExt};
use std::path::PathBuf;
use strata_manifest::Manifest;
use strata_media::{MediaKind, MetadataSource};
use strata_storage::BackendHandle;

/// Progress events emitted by [`import`] as it works through a source tree.
///
/// Events follow a strict ordering:
/// 1. [`Started`](Self::Started): exactly once.
/// 2. For every batch, one [`Batch`](Self::Batch) followed by one
///    [`Imported`](Self::Imported) (or `Err` item) per file of the batch.
/// 3. [`Complete`](Self::Complete): exactly once, signalling the stream is
///    finished.
///
/// A fatal error terminates the stream early, in which case
/// [`Complete`](Self::Complete) is never emitted.
#[derive(Debug)]
pub enum ImportEvent {
    /// Importing has begun; emitted exactly once before any other event.
    Started,
    /// Metadata for the next batch of this many files has been extracted.
    Batch(usize),
    /// A file has been imported.
    Imported(Import),
    /// The whole source tree has been imported; the stream is finished.
    Complete,
}

/// Streams [`ImportEvent`]s for every file in `source`, importing each one into
/// `target` and recording it in `manifest`.
///
/// Files are listed from `source` and handled in batches of
/// [`ctx.batch_size`](Context::batch_size): the metadata of a whole batch is
/// requested from `extractor` at once, then its files are imported one after
/// another with [`import_file`]. Files of an unsupported kind are never sent
/// to the extractor. The configuration file ([`SIDECAR_FILE_NAME`]) is
/// skipped wherever it appears.
///
/// Individual file failures (and listing failures) are surfaced as `Err`
/// items without terminating the stream. A metadata source that fails, or
/// returns nothing at all for a non-empty batch, is fatal: importing without
/// metadata would put every file in the wrong place.
///
/// The manifest is only modified in memory; persisting it is up to the
/// caller, even when the stream ends early.
pub fn import<'a, M: MetadataSource>(
    source: &'a BackendHandle,
    target: &'a BackendHandle,
    manifest: &'a mut Manifest,
    extractor: &'a mut M,
    ctx: &'a Context,
    options: &'a ImportOptions,
) -> impl Stream<Item = LibraryResult<ImportEvent>> + 'a {
    stream!({
        yield Ok(ImportEvent::Started);

        let mut chunks = source.list_stream().chunks(ctx.batch_size.max(1));
        while let Some(chunk) = chunks.next().await {
            let mut paths: Vec<PathBuf> = Vec::with_capacity(chunk.len());
            for listed in chunk {
                let absolute = listed.and_then(|info| {
                    if info.path.file_name().is_some_and(|name| name == SIDECAR_FILE_NAME) {
                        return Ok(None);
                    }
                    source.absolute(&info.path).map(Some)
                });
                match absolute {
                    Ok(Some(path)) => paths.push(path),
                    Ok(None) => {},
                    Err(e) => {
                        yield Err(e).or_raise(|| LibraryErrorKind::Storage);
                    },
                }
            }
            if paths.is_empty() {
                continue;
            }

            let requested: Vec<PathBuf> = paths.iter().filter(|p| MediaKind::from_path(p).is_some()).cloned().collect();
            let batch = match extractor.extract(&requested).await {
                Ok(batch) if batch.is_empty() && !requested.is_empty() => {
                    tracing::error!(files = requested.len(), "Metadata source returned nothing for batch");
                    yield Err(Exn::from(LibraryErrorKind::Metadata));
                    return;
                },
                Ok(batch) => batch,
                Err(e) => {
                    yield Err(e).or_raise(|| LibraryErrorKind::Metadata);
                    return;
                },
            };
            tracing::debug!(files = paths.len(), extracted = batch.len(), "Importing batch");
            yield Ok(ImportEvent::Batch(paths.len()));

            for path in &paths {
                yield import_file(target, manifest, ctx, path, &batch, options).await.map(ImportEvent::Imported);
            }
        }

        yield Ok(ImportEvent::Complete);
    })
}
