use crate::cli::ImportArgs;
use crate::commands::{run_file, shutdown_exiftool, spawn_exiftool};
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use futures::{Stream, StreamExt};
use std::path::PathBuf;
use std::pin::pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use strata_config::Config;
use strata_library::Context;
use strata_library::error::Error as LibraryError;
use strata_library::import::{ImportEvent, ImportOptions, import};
use strata_library::report::Report;
use strata_manifest::{Manifest, WriteOptions};
use strata_media::MetadataSource;
use strata_storage::backend::LocalBackend;
use strata_storage::{BackendHandle, Transfer};
use time::OffsetDateTime;
use tracing::instrument;

/// The JSON log of a run started at `started`.
pub fn log_path(args: &ImportArgs, started: OffsetDateTime) -> PathBuf {
    run_file(&args.manifest, "import", started, "log")
}

/// How far a run got.
#[derive(Debug, Default)]
struct Progress {
    files: usize,
    interrupted: bool,
    fatal: Option<LibraryError>,
}

#[instrument(skip_all, fields(manifest = %args.manifest.display(), dry_run = args.dry_run))]
pub async fn run(args: ImportArgs, started: OffsetDateTime) -> Result<bool> {
    let clock = Instant::now();
    let mut config = Config::load(&args.config).or_raise(|| ErrorKind::Config)?;
    if let Some(source) = &args.source {
        config = config.with_source(source);
    }
    let source_dir = std::path::absolute(&config.source().or_raise(|| ErrorKind::Config)?.file_path)
        .or_raise(|| ErrorKind::Config)?;
    let target_config = config.target().or_raise(|| ErrorKind::Config)?;
    let target_dir = std::path::absolute(&target_config.base_path).or_raise(|| ErrorKind::Config)?;
    let ctx = Context::new(&target_config.file_path_pattern, config.batch_size).or_raise(|| ErrorKind::Config)?;

    let source: BackendHandle = Arc::new(LocalBackend::open("source", &source_dir).or_raise(|| ErrorKind::Config)?);
    let target: BackendHandle = Arc::new(LocalBackend::new("target", &target_dir).or_raise(|| ErrorKind::Storage)?);
    let mut manifest = Manifest::load(&args.manifest).or_raise(|| ErrorKind::Manifest)?;
    let known = manifest.len();
    let options = ImportOptions {
        transfer: if args.move_files { Transfer::Move } else { Transfer::Copy },
        allow_duplicates: args.allow_duplicates,
        dry_run: args.dry_run,
    };
    tracing::info!(source = %source_dir.display(), target = %target_dir.display(), pattern = %ctx.pattern, "Importing");

    let mut exiftool = spawn_exiftool(&config.exiftool)?;
    let interrupt = Arc::new(AtomicBool::new(false));
    let listener = tokio::spawn(listen_for_interrupt(Arc::clone(&interrupt)));
    let mut report = Report::default();
    let events = import(&source, &target, &mut manifest, &mut exiftool, &ctx, &options);
    let progress = drive(events, &mut report, &interrupt).await;
    listener.abort();
    let waiting = exiftool.waiting_time();
    shutdown_exiftool(exiftool).await;

    // Everything recorded so far is kept, even after an interruption or a fatal error.
    if !options.dry_run {
        manifest
            .write(WriteOptions { indent: args.indent_manifest, overwrite: !args.no_overwrite_manifest })
            .or_raise(|| ErrorKind::Manifest)?;
    }
    let report_path = run_file(&args.manifest, "import", started, "jsonl");
    if let Err(e) = report.write(&report_path) {
        tracing::warn!(path = %report_path.display(), error = %e, "Failed to write report");
    }

    print_statistics(&Statistics {
        files: progress.files,
        failures: report.failures(),
        new_hashes: manifest.len().saturating_sub(known),
        total_hashes: manifest.len(),
        elapsed: clock.elapsed(),
        waiting,
    });

    if let Some(fatal) = progress.fatal {
        return Err(fatal).or_raise(|| ErrorKind::Aborted);
    }
    Ok(!progress.interrupted && !report.has_failures())
}

/// Set `interrupt` on the first Ctrl-C.
async fn listen_for_interrupt(interrupt: Arc<AtomicBool>) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::warn!("Interrupted; finishing the current file");
            interrupt.store(true, Ordering::SeqCst);
        },
        Err(e) => tracing::warn!(error = %e, "Cannot listen for Ctrl-C"),
    }
}

/// Consume the import stream, recording every file in `report`, until it
/// completes or fails fatally. Once `interrupt` is set the stream is dropped
/// after the event at hand, so a file being placed is always placed and
/// recorded in full.
async fn drive(
    events: impl Stream<Item = strata_library::error::Result<ImportEvent>>,
    report: &mut Report,
    interrupt: &AtomicBool,
) -> Progress {
    let mut events = pin!(events);
    let mut progress = Progress::default();
    while let Some(event) = events.next().await {
        match event {
            Ok(ImportEvent::Imported(imported)) => {
                progress.files += 1;
                tracing::debug!(
                    source = %imported.source.display(),
                    checksum = %imported.checksum,
                    action = ?imported.action,
                    "Imported file"
                );
                report.success(&imported.source, imported.action.destination());
            },
            Ok(ImportEvent::Batch(size)) => tracing::debug!(size, "Read metadata"),
            Ok(ImportEvent::Started | ImportEvent::Complete) => {},
            Err(e) if e.is_fatal() => {
                tracing::error!(error = ?e, "Import aborted");
                report.failure(None, &e);
                progress.fatal = Some(e);
                break;
            },
            Err(e) => {
                if e.path().is_some() {
                    progress.files += 1;
                }
                tracing::error!(path = ?e.path(), error = ?e, "Failed to import file");
                report.failure(e.path(), &e);
            },
        }
        if interrupt.load(Ordering::SeqCst) {
            tracing::warn!(files = progress.files, "Stopping; saving what was imported so far");
            progress.interrupted = true;
            break;
        }
    }
    progress
}

struct Statistics {
    files: usize,
    failures: usize,
    new_hashes: usize,
    total_hashes: usize,
    elapsed: Duration,
    waiting: Duration,
}

fn print_statistics(stats: &Statistics) {
    let per_second = match stats.elapsed.as_secs_f64() {
        secs if secs > 0.0 => stats.files as f64 / secs,
        _ => 0.0,
    };
    tracing::info!(
        files = stats.files,
        failures = stats.failures,
        new_hashes = stats.new_hashes,
        total_hashes = stats.total_hashes,
        elapsed = ?stats.elapsed,
        exiftool_waiting = ?stats.waiting,
        "Import finished"
    );
    println!("Source files:     {} ({} failed)", stats.files, stats.failures);
    println!("New hashes:       {}", stats.new_hashes);
    println!("Total hashes:     {}", stats.total_hashes);
    println!("Elapsed:          {:.2?} ({per_second:.1} files/s)", stats.elapsed);
    println!("Waiting on ExifTool: {:.2?}", stats.waiting);
}
