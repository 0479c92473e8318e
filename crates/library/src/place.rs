use std::path::{Path, PathBuf};
use strata_storage::error::{ErrorKind as StorageErrorKind, Result as StorageResult};
use strata_storage::{BackendHandle, Transfer};
use tracing::instrument;

/// Where a file ended up, relative to the library root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Placement {
    /// The destination was free and now holds the file.
    Placed(PathBuf),
    /// The destination already holds identical content. When moving, the
    /// redundant source has been removed.
    AlreadyPresent(PathBuf),
    /// The destination holds different content; the file went next to it
    /// under a name carrying its checksum.
    Diverged(PathBuf),
}

/// `IMG.jpg` → `IMG.<checksum>.jpg`
fn diverged_path(destination: &Path, checksum: &str) -> PathBuf {
    let stem = destination.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
    let name = match destination.extension() {
        Some(extension) => format!("{stem}.{checksum}.{}", extension.to_string_lossy()),
        None => format!("{stem}.{checksum}"),
    };
    destination.with_file_name(name)
}

/// Checksum of the file at `path`, or `None` if there is no file.
async fn occupant(target: &BackendHandle, path: &Path) -> StorageResult<Option<String>> {
    match target.checksum(path).await {
        Ok(checksum) => Ok(Some(checksum)),
        Err(e) if matches!(&*e, StorageErrorKind::NotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Put the file at absolute `source` (whose content hashes to `checksum`)
/// at `destination` inside `target`, never overwriting anything.
///
/// Resolution when `destination` is occupied:
/// 1. Same content: nothing to place. In [`Transfer::Move`] mode the source
///    is removed, as it would have been by the move.
/// 2. Different content: place at `<stem>.<checksum>.<ext>` instead, with the
///    same rule applied if that name is taken too. Identical content there
///    counts as already present; anything else is
///    [`AlreadyExists`](StorageErrorKind::AlreadyExists).
#[instrument(skip_all, fields(source = %source.display(), destination = %destination.display()))]
pub(crate) async fn place(
    target: &BackendHandle,
    source: &Path,
    checksum: &str,
    destination: &Path,
    transfer: Transfer,
) -> StorageResult<Placement> {
    let absolute = target.absolute(destination)?;
    if absolute == source {
        // The file already is where it belongs.
        return Ok(Placement::AlreadyPresent(destination.to_path_buf()));
    }

    let (destination, diverged) = match occupant(target, destination).await? {
        None => (destination.to_path_buf(), false),
        Some(existing) if existing == checksum => return already_present(target, source, destination, transfer).await,
        Some(_) => {
            let alternative = diverged_path(destination, checksum);
            match occupant(target, &alternative).await? {
                None => (alternative, true),
                Some(existing) if existing == checksum => {
                    return already_present(target, source, &alternative, transfer).await;
                },
                Some(_) => exn::bail!(StorageErrorKind::AlreadyExists(alternative)),
            }
        },
    };

    target.place(source, &destination, transfer).await?;
    tracing::debug!(destination = %destination.display(), diverged, "Placed file");
    Ok(match diverged {
        true => Placement::Diverged(destination),
        false => Placement::Placed(destination),
    })
}

async fn already_present(
    target: &BackendHandle,
    source: &Path,
    destination: &Path,
    transfer: Transfer,
) -> StorageResult<Placement> {
    if transfer == Transfer::Move {
        target.discard(source).await?;
    }
    Ok(Placement::AlreadyPresent(destination.to_path_buf()))
}
