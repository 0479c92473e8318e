//! Log output: human-readable lines on stderr, plus (for imports) a JSON log
//! file that keeps a machine-readable record of every event of the run.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::fs::{self, File};
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

/// Install the global subscriber.
///
/// The level comes from `RUST_LOG` (default `info`); `debug` forces debug
/// output for this crate and its libraries. Every line of `log_file` is
/// written as soon as it is logged, so an interrupted run loses nothing.
pub fn init(debug: bool, log_file: Option<&Path>) -> Result<()> {
    let filter = match debug {
        true => EnvFilter::new("info,strata=debug"),
        false => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    let file_layer = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).or_raise(|| ErrorKind::Logging)?;
            }
            let file = File::create(path).or_raise(|| ErrorKind::Logging)?;
            Some(fmt::layer().json().with_writer(Mutex::new(file)))
        },
        None => None,
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .try_init()
        .or_raise(|| ErrorKind::Logging)
}
