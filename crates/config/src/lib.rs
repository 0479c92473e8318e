//! Import configuration and application settings.
//!
//! The import configuration is a JSON document naming where media is read
//! from and where (and how) it is organized:
//!
//! ```json
//! {
//!   "sources": [{ "file_path": "/media/sdcard/DCIM" }],
//!   "targets": [{ "base_path": "/srv/photos", "file_path_pattern": "%year/%date/%album|\"Unsorted\"" }],
//!   "batch_size": 50
//! }
//! ```
//!
//! Any value can be overridden from the environment with a `STRATA_` prefix,
//! nested keys separated by a double underscore (`STRATA_EXIFTOOL__PATH`).
//! Only the first source and the first target are honored at the moment.

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::BaseDirs;
use exn::{OptionExt, ResultExt};
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::instrument;

/// Prefix for environment variable overrides.
pub const ENV_PREFIX: &str = "STRATA_";
/// How many files are handed to the metadata extractor at once. Larger
/// batches are faster, at the cost of memory.
pub const DEFAULT_BATCH_SIZE: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub file_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub base_path: PathBuf,
    pub file_path_pattern: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExifToolConfig {
    /// Executable to spawn; looked up on `PATH` when not absolute.
    #[serde(default = "ExifToolConfig::default_path")]
    pub path: PathBuf,
    /// ExifTool configuration file defining custom tags (album, origin and
    /// the original file name live in a custom XMP namespace).
    #[serde(default)]
    pub config_file: Option<PathBuf>,
    /// Give up on a batch after this many seconds. No limit when unset.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}
impl ExifToolConfig {
    fn default_path() -> PathBuf {
        PathBuf::from("exiftool")
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}
impl Default for ExifToolConfig {
    fn default() -> Self {
        Self { path: Self::default_path(), config_file: None, timeout_secs: None }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub sources: Vec<Source>,
    #[serde(default)]
    pub targets: Vec<Target>,
    #[serde(default = "Config::default_batch_size")]
    pub batch_size: usize,
    #[serde(default)]
    pub exiftool: ExifToolConfig,
}
impl Config {
    fn default_batch_size() -> usize {
        DEFAULT_BATCH_SIZE
    }

    /// Load the configuration file at `path`, applying environment overrides.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            exn::bail!(ErrorKind::NotFound(path.to_path_buf()));
        }
        if path.extension().is_none_or(|ext| ext != "json") {
            exn::bail!(ErrorKind::NotJson(path.to_path_buf()));
        }
        let config: Self = Figment::new()
            .merge(Json::file_exact(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .or_raise(|| ErrorKind::Parse)?;
        config.validate()?;
        tracing::debug!(sources = config.sources.len(), targets = config.targets.len(), "Loaded configuration");
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            exn::bail!(ErrorKind::Invalid { field: "batch_size", reason: "must be at least 1".to_string() });
        }
        Ok(())
    }

    /// Prepend a source directory (e.g. given on the command line), so that it
    /// becomes the honored one.
    pub fn with_source(mut self, file_path: impl Into<PathBuf>) -> Self {
        self.sources.insert(0, Source { file_path: file_path.into() });
        self
    }

    /// The source that is imported from.
    pub fn source(&self) -> Result<&Source> {
        self.sources.first().ok_or_raise(|| ErrorKind::Missing("sources"))
    }

    /// The target that is organized into.
    pub fn target(&self) -> Result<&Target> {
        self.targets.first().ok_or_raise(|| ErrorKind::Missing("targets"))
    }
}

/// Machine-wide settings, independent of any one import configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Directory holding the hash database and its backups.
    pub application_directory: PathBuf,
}
impl Settings {
    const HASH_DB_FILE_NAME: &str = "hash.json";

    /// Resolve settings: `~/.strata`, unless `STRATA_APPLICATION_DIRECTORY` says otherwise.
    pub fn discover() -> Result<Self> {
        let home = BaseDirs::new().ok_or_raise(|| ErrorKind::NoHomeDirectory)?.home_dir().to_path_buf();
        let defaults = Self { application_directory: home.join(".strata") };
        Figment::from(Serialized::defaults(defaults))
            .merge(Env::prefixed(ENV_PREFIX).only(&["application_directory"]))
            .extract()
            .or_raise(|| ErrorKind::Parse)
    }

    /// Well-known location of the hash database.
    pub fn hash_db(&self) -> PathBuf {
        self.application_directory.join(Self::HASH_DB_FILE_NAME)
    }
}
