use crate::Context;
use crate::error::{ErrorKind as LibraryErrorKind, Result as LibraryResult};
use crate::naming::sanitize_title;
use crate::place::{Placement, place};
use crate::update::Changes;
use crate::update::error::{ErrorKind as UpdateErrorKind, Result as UpdateResult};
use exn::{OptionExt, ResultExt};
use std::path::{Path, PathBuf};
use strata_media::{MediaKind, MediaMetadata, MetadataSource};
use strata_storage::{BackendHandle, Transfer};
use tracing::instrument;

/// How many directories above a moved file are removed when left empty.
const PRUNE_LEVELS: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Update {
    /// Absolute path the file had before the update.
    pub source: PathBuf,
    /// Where the file is now, relative to the library root.
    pub destination: PathBuf,
    /// Whether the file changed location.
    pub moved: bool,
    /// Directories removed because the move left them empty.
    pub pruned: Vec<PathBuf>,
}

/// Write `changes` into the file at absolute `path` and move it to the
/// location its new metadata resolves to inside `target`.
///
/// Files outside the root of `target` are refused before anything is written.
/// When the title changes, the previous title is removed from the file name
/// first, so that repeated title updates replace rather than accumulate.
/// Identical content already at the new location counts as a completed move.
///
/// # Errors
/// Returns [`Exn<LibraryErrorKind::Update>`](LibraryErrorKind::Update)
/// raised from an inner [`Exn<UpdateErrorKind>`](UpdateErrorKind).
pub async fn update_file<M: MetadataSource>(
    target: &BackendHandle,
    extractor: &mut M,
    ctx: &Context,
    path: &Path,
    changes: &Changes,
) -> LibraryResult<Update> {
    update_file_inner(target, extractor, ctx, path, changes)
        .await
        .or_raise(|| LibraryErrorKind::Update(path.to_path_buf()))
}

async fn read_metadata<M: MetadataSource>(extractor: &mut M, path: &Path) -> UpdateResult<MediaMetadata> {
    let mut batch = extractor.extract(&[path.to_path_buf()]).await.or_raise(|| UpdateErrorKind::Metadata)?;
    batch.remove(path).ok_or_raise(|| UpdateErrorKind::Metadata)
}

#[instrument(skip_all, fields(source = %path.display()))]
async fn update_file_inner<M: MetadataSource>(
    target: &BackendHandle,
    extractor: &mut M,
    ctx: &Context,
    path: &Path,
    changes: &Changes,
) -> UpdateResult<Update> {
    if !path.starts_with(target.root()) {
        exn::bail!(UpdateErrorKind::OutsideLibrary(path.to_path_buf()));
    }
    if !tokio::fs::metadata(path).await.is_ok_and(|m| m.is_file()) {
        exn::bail!(UpdateErrorKind::NotFound);
    }
    if MediaKind::from_path(path).is_none() {
        let extension = path.extension().map(|e| e.to_string_lossy().into_owned()).unwrap_or_default();
        exn::bail!(UpdateErrorKind::Unsupported(extension));
    }

    let before = read_metadata(extractor, path).await?;
    let updates = changes.tag_updates();
    if !updates.is_empty() {
        extractor.write(path, &updates).await.or_raise(|| UpdateErrorKind::Metadata)?;
    }
    let mut after = read_metadata(extractor, path).await?;

    if changes.title.is_some()
        && let Some(previous) = before.title.as_deref().map(sanitize_title).filter(|t| !t.is_empty())
    {
        after.base_name = after.base_name.replace(&format!("-{previous}"), "");
    }

    let destination = ctx.target_for(&after).relative_path();
    let checksum = strata_storage::checksum(path).await.or_raise(|| UpdateErrorKind::Checksum)?;
    let placement = place(target, path, &checksum, &destination, Transfer::Move)
        .await
        .or_raise(|| UpdateErrorKind::Storage)?;
    let destination = match placement {
        Placement::Placed(p) | Placement::AlreadyPresent(p) | Placement::Diverged(p) => p,
    };

    let moved = target.absolute(&destination).or_raise(|| UpdateErrorKind::Storage)? != path;
    let mut pruned = Vec::new();
    if moved && let Some(parent) = path.parent() {
        match target.prune(parent, PRUNE_LEVELS).await {
            Ok(removed) => pruned = removed,
            Err(e) => tracing::warn!(directory = %parent.display(), error = ?e, "Could not remove empty directory"),
        }
    }
    tracing::info!(destination = %destination.display(), moved, "Updated");
    Ok(Update { source: path.to_path_buf(), destination, moved, pruned })
}
