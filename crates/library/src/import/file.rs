use crate::error::{ErrorKind as LibraryErrorKind, Result as LibraryResult};
use crate::import::error::{ErrorKind as ImportErrorKind, Result as ImportResult};
use crate::naming::embedded_timestamp;
use crate::place::{Placement, place};
use crate::{Context, source_record};
use exn::{OptionExt, ResultExt};
use std::path::{Path, PathBuf};
use strata_manifest::{Manifest, ManifestEntry};
use strata_media::{MediaKind, MediaMetadata, MetadataBatch};
use strata_storage::{BackendHandle, Transfer};
use tracing::instrument;

/// How files are brought into the library.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImportOptions {
    pub transfer: Transfer,
    /// Place content again even when the manifest already knows it.
    pub allow_duplicates: bool,
    /// Record in the manifest, but leave the filesystem alone.
    pub dry_run: bool,
}

/// What happened to a (successfully) imported file.
///
/// Paths are relative to the library root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Known content; recorded, not placed.
    Skipped,
    /// Dry run; the file would have been placed here.
    Planned(PathBuf),
    Copied(PathBuf),
    Moved(PathBuf),
    /// Identical content was already at the destination.
    AlreadyPresent(PathBuf),
    /// Different content occupied the destination; the file was placed next
    /// to it under a checksum-suffixed name.
    Diverged(PathBuf),
}

impl Action {
    /// Where the content lives in the library, if anywhere.
    pub fn destination(&self) -> Option<&Path> {
        match self {
            Self::Skipped => None,
            Self::Planned(p) | Self::Copied(p) | Self::Moved(p) | Self::AlreadyPresent(p) | Self::Diverged(p) => {
                Some(p)
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    /// Absolute path the file was imported from.
    pub source: PathBuf,
    pub checksum: String,
    pub action: Action,
}

/// Import the file at absolute `path` into `target`, recording it in
/// `manifest`.
///
/// `batch` must hold the file's metadata, as extracted by a
/// [`MetadataSource`](strata_media::MetadataSource).
///
/// Steps, in order:
/// 1. The file must exist and be of a supported [`MediaKind`].
/// 2. Its checksum decides whether the manifest already knows the content.
/// 3. Known content is recorded and [`Action::Skipped`], unless
///    [`allow_duplicates`](ImportOptions::allow_duplicates) is set.
/// 4. A [dry run](ImportOptions::dry_run) records and stops at [`Action::Planned`].
/// 5. Otherwise the file is placed at the entry's target (the target recorded
///    first wins for known content) and only then recorded, so the manifest
///    never names a file that was not completely placed.
///
/// Content placed under a checksum-suffixed name because of a collision is
/// recorded under that name.
///
/// Copied files get their modification time from the capture time (from a
/// date prefix in the name if there is one); moved files keep theirs.
///
/// # Errors
/// Returns [`Exn<LibraryErrorKind::Import>`](LibraryErrorKind::Import)
/// raised from an inner [`Exn<ImportErrorKind>`](ImportErrorKind).
pub async fn import_file(
    target: &BackendHandle,
    manifest: &mut Manifest,
    ctx: &Context,
    path: &Path,
    batch: &MetadataBatch,
    options: &ImportOptions,
) -> LibraryResult<Import> {
    import_file_inner(target, manifest, ctx, path, batch, options)
        .await
        .or_raise(|| LibraryErrorKind::Import(path.to_path_buf()))
}

#[instrument(skip_all, fields(source = %path.display()))]
async fn import_file_inner(
    target: &BackendHandle,
    manifest: &mut Manifest,
    ctx: &Context,
    path: &Path,
    batch: &MetadataBatch,
    options: &ImportOptions,
) -> ImportResult<Import> {
    if !tokio::fs::metadata(path).await.is_ok_and(|m| m.is_file()) {
        exn::bail!(ImportErrorKind::NotFound);
    }
    if MediaKind::from_path(path).is_none() {
        let extension = path.extension().map(|e| e.to_string_lossy().into_owned()).unwrap_or_default();
        exn::bail!(ImportErrorKind::Unsupported(extension));
    }
    let metadata = batch.get(path).ok_or_raise(|| ImportErrorKind::MissingMetadata)?;
    let checksum = strata_storage::checksum(path).await.or_raise(|| ImportErrorKind::Checksum)?;
    let is_duplicate = manifest.contains(&checksum);

    let mut entry = ManifestEntry::new(path.to_string_lossy(), source_record(metadata), ctx.target_for(metadata));
    let done = |action| Import { source: path.to_path_buf(), checksum: checksum.clone(), action };

    if is_duplicate && !options.allow_duplicates {
        tracing::info!(%checksum, "Already in library, skipping");
        manifest.merge(&checksum, entry);
        return Ok(done(Action::Skipped));
    }

    let destination = match manifest.get(&checksum) {
        Some(existing) => existing.target.relative_path(),
        None => entry.target.relative_path(),
    };
    if options.dry_run {
        tracing::info!(destination = %destination.display(), "Would import");
        manifest.merge(&checksum, entry);
        return Ok(done(Action::Planned(destination)));
    }

    let placement = place(target, path, &checksum, &destination, options.transfer)
        .await
        .or_raise(|| ImportErrorKind::Storage)?;
    let action = match (placement, options.transfer) {
        (Placement::Placed(p), Transfer::Copy) => {
            set_capture_time(target, &p, metadata).await;
            Action::Copied(p)
        },
        (Placement::Placed(p), Transfer::Move) => Action::Moved(p),
        (Placement::AlreadyPresent(p), _) => Action::AlreadyPresent(p),
        (Placement::Diverged(p), transfer) => {
            if transfer == Transfer::Copy {
                set_capture_time(target, &p, metadata).await;
            }
            tracing::warn!(destination = %p.display(), "Destination held different content, placed alongside");
            if !is_duplicate && let Some(name) = p.file_name() {
                // New content: record where it actually went.
                entry.target.name = name.to_string_lossy().into_owned();
            }
            Action::Diverged(p)
        },
    };
    manifest.merge(&checksum, entry);
    tracing::info!(%checksum, destination = ?action.destination(), "Imported");
    Ok(done(action))
}

/// Copies carry the time they were copied; give them the time the media was
/// captured instead. Failing to do so does not fail the import.
async fn set_capture_time(target: &BackendHandle, path: &Path, metadata: &MediaMetadata) {
    let Some(captured) = embedded_timestamp(&metadata.base_name).or(metadata.date_taken) else {
        return;
    };
    if let Err(e) = target.set_modified(path, captured.assume_utc()).await {
        tracing::warn!(path = %path.display(), error = ?e, "Could not set modification time");
    }
}
