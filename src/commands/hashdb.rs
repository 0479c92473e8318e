//! Commands on the machine-wide hash database.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use futures::StreamExt;
use std::path::Path;
use std::pin::pin;
use std::sync::Arc;
use strata_config::Settings;
use strata_library::audit::{AuditEvent, rebuild, verify};
use strata_manifest::HashDb;
use strata_storage::BackendHandle;
use strata_storage::backend::LocalBackend;
use tracing::instrument;

fn load() -> Result<HashDb> {
    let settings = Settings::discover().or_raise(|| ErrorKind::Config)?;
    HashDb::load(settings.hash_db()).or_raise(|| ErrorKind::HashDb)
}

/// Replace the hash database with the checksums of every file below
/// `directory`, keeping a backup of the previous one.
#[instrument(skip_all, fields(directory = %directory.display()))]
pub async fn generate(directory: &Path) -> Result<bool> {
    let directory = std::path::absolute(directory).or_raise(|| ErrorKind::Usage("unresolvable directory".to_string()))?;
    let source: BackendHandle = Arc::new(LocalBackend::open("records", &directory).or_raise(|| ErrorKind::Storage)?);
    let mut db = load()?;
    if let Some(backup) = db.backup().or_raise(|| ErrorKind::HashDb)? {
        tracing::info!(backup = %backup.display(), "Backed up hash database");
    }
    db.reset();

    let mut failures = 0;
    {
        let mut events = pin!(rebuild(&source, &mut db));
        while let Some(event) = events.next().await {
            match event {
                Ok(AuditEvent::Recorded { path, checksum }) => {
                    tracing::debug!(path = %path.display(), %checksum, "Recorded file");
                },
                Ok(_) => {},
                Err(e) => {
                    failures += 1;
                    tracing::error!(path = ?e.path(), error = ?e, "Failed to record file");
                },
            }
        }
    }
    db.write().or_raise(|| ErrorKind::HashDb)?;
    println!("Recorded {} hashes ({failures} files failed)", db.len());
    Ok(failures == 0)
}

/// Check every file recorded in the hash database.
#[instrument(skip_all)]
pub async fn verify_all() -> Result<bool> {
    let db = load()?;
    let (mut passed, mut failed) = (0usize, 0usize);
    let mut events = pin!(verify(&db));
    while let Some(event) = events.next().await {
        match event {
            Ok(AuditEvent::Verified { ok: true, .. }) => passed += 1,
            Ok(AuditEvent::Verified { path, ok: false }) => {
                failed += 1;
                println!("✗ {}", path.display());
            },
            Ok(_) => {},
            Err(e) => {
                failed += 1;
                tracing::error!(path = ?e.path(), error = ?e, "Failed to verify file");
            },
        }
    }
    println!("{passed} verified, {failed} failed");
    Ok(failed == 0)
}
