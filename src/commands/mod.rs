//! One module per subcommand. Every command returns `Ok(true)` when all of
//! its files succeeded, `Ok(false)` when some did not (or the run was
//! interrupted), and `Err` when it could not do its job at all.

pub mod hashdb;
pub mod import;
pub mod manifest;
pub mod update;

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::path::{Path, PathBuf};
use strata_config::ExifToolConfig;
use strata_manifest::TIMESTAMP_FORMAT;
use strata_media::{ExifTool, ExifToolOptions, MetadataSource};
use time::OffsetDateTime;

/// Logs and reports of every run live here, next to the file the run is
/// anchored on (the manifest for imports, the configuration for updates).
const RUN_DIRECTORY: &str = ".strata";

/// `<anchor directory>/.strata/<command>_<started>.<extension>`
fn run_file(anchor: &Path, command: &str, started: OffsetDateTime, extension: &str) -> PathBuf {
    let stamp = started.format(TIMESTAMP_FORMAT).unwrap_or_default();
    anchor.parent().unwrap_or(Path::new("")).join(RUN_DIRECTORY).join(format!("{command}_{stamp}.{extension}"))
}

fn spawn_exiftool(config: &ExifToolConfig) -> Result<ExifTool> {
    ExifTool::spawn(ExifToolOptions {
        program: config.path.clone(),
        config_file: config.config_file.clone(),
        timeout: config.timeout(),
    })
    .or_raise(|| ErrorKind::Metadata)
}

async fn shutdown_exiftool(exiftool: ExifTool) {
    if let Err(e) = exiftool.shutdown().await {
        tracing::warn!(error = ?e, "ExifTool did not shut down cleanly");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_run_files_sit_next_to_the_anchor() {
        let started = datetime!(2024-01-31 13:45:00 UTC);
        assert_eq!(
            run_file(Path::new("/srv/photos/manifest.json"), "import", started, "log"),
            PathBuf::from("/srv/photos/.strata/import_2024-01-31_13-45-00.log")
        );
        assert_eq!(
            run_file(Path::new("import.json"), "update", started, "jsonl"),
            PathBuf::from(".strata/update_2024-01-31_13-45-00.jsonl")
        );
    }
}
