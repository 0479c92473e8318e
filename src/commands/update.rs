use crate::cli::UpdateArgs;
use crate::commands::{run_file, shutdown_exiftool, spawn_exiftool};
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use futures::{Stream, StreamExt};
use std::path::PathBuf;
use std::pin::pin;
use std::sync::Arc;
use strata_config::Config;
use strata_library::Context;
use strata_library::report::Report;
use strata_library::update::{UpdateEvent, update};
use strata_storage::BackendHandle;
use strata_storage::backend::LocalBackend;
use time::OffsetDateTime;
use tracing::instrument;

/// The JSON log of a run started at `started`. Update runs are kept next to
/// the configuration, since there is no manifest involved.
pub fn log_path(args: &UpdateArgs, started: OffsetDateTime) -> PathBuf {
    run_file(&args.config, "update", started, "log")
}

/// Update files of the library named by the configuration's target.
#[instrument(skip_all, fields(paths = args.paths.len()))]
pub async fn run(args: UpdateArgs, started: OffsetDateTime) -> Result<bool> {
    let changes = args.changes();
    if changes.is_empty() {
        exn::bail!(ErrorKind::Usage("nothing to update".to_string()));
    }
    let config = Config::load(&args.config).or_raise(|| ErrorKind::Config)?;
    let target_config = config.target().or_raise(|| ErrorKind::Config)?;
    let library = std::path::absolute(&target_config.base_path).or_raise(|| ErrorKind::Config)?;
    let ctx = Context::new(&target_config.file_path_pattern, config.batch_size).or_raise(|| ErrorKind::Config)?;
    let target: BackendHandle = Arc::new(LocalBackend::open("library", &library).or_raise(|| ErrorKind::Config)?);
    let paths = args
        .paths
        .iter()
        .map(std::path::absolute)
        .collect::<std::io::Result<Vec<_>>>()
        .or_raise(|| ErrorKind::Usage("paths must be resolvable".to_string()))?;

    let mut exiftool = spawn_exiftool(&config.exiftool)?;
    let report = record(update(&target, &mut exiftool, &ctx, &paths, &changes)).await;
    shutdown_exiftool(exiftool).await;

    let report_path = run_file(&args.config, "update", started, "jsonl");
    if let Err(e) = report.write(&report_path) {
        tracing::warn!(path = %report_path.display(), error = %e, "Failed to write report");
    }
    println!("Updated {} files, {} failed", report.successes(), report.failures());
    println!("Report:  {}", report_path.display());
    Ok(!report.has_failures())
}

/// Drain the update stream into a [`Report`], one outcome per file.
async fn record(events: impl Stream<Item = strata_library::error::Result<UpdateEvent>>) -> Report {
    let mut events = pin!(events);
    let mut report = Report::default();
    while let Some(event) = events.next().await {
        match event {
            Ok(UpdateEvent::Updated(updated)) => {
                tracing::info!(
                    source = %updated.source.display(),
                    destination = %updated.destination.display(),
                    moved = updated.moved,
                    "Updated file"
                );
                report.success(&updated.source, Some(&updated.destination));
            },
            Ok(UpdateEvent::Started | UpdateEvent::Complete) => {},
            Err(e) => {
                tracing::error!(path = ?e.path(), error = ?e, "Failed to update file");
                report.failure(e.path(), &e);
            },
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_library::update::Changes;
    use strata_media::StaticSource;

    #[tokio::test]
    async fn test_report_lists_every_path() {
        let dir = tempfile::tempdir().unwrap();
        let target: BackendHandle = Arc::new(LocalBackend::new("library", dir.path().join("library")).unwrap());
        let missing = target.root().join("2020-03-04/gone.jpg");
        let outside = dir.path().join("elsewhere.jpg");
        std::fs::write(&outside, r#"{"EXIF:DateTimeOriginal":"2020:03:04 10:20:30"}"#).unwrap();
        let ctx = Context::new("%date", 10).unwrap();
        let changes = Changes { title: Some("Beach".into()), ..Default::default() };
        let paths = vec![missing.clone(), outside.clone()];
        let mut extractor = StaticSource::default();

        let report = record(update(&target, &mut extractor, &ctx, &paths, &changes)).await;
        assert_eq!(report.failures(), 2);
        assert!(report.has_failures());

        let report_path = run_file(&dir.path().join("import.json"), "update", OffsetDateTime::UNIX_EPOCH, "jsonl");
        report.write(&report_path).unwrap();
        let written = std::fs::read_to_string(&report_path).unwrap();
        assert_eq!(written.lines().count(), 2);
        assert!(written.contains(&*missing.to_string_lossy()));
        assert!(written.contains(&*outside.to_string_lossy()));
        assert!(outside.is_file());
    }
}
