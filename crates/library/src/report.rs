//! Per-file outcomes of a run, in a machine-readable form.
//!
//! A [`Report`] is held by whoever drives a run and written out once at the
//! end as JSON lines, one [`Outcome`] per line.

use serde::Serialize;
use std::fmt::Debug;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome {
    pub path: PathBuf,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Default)]
pub struct Report {
    outcomes: Vec<Outcome>,
}

impl Report {
    pub fn success(&mut self, path: impl Into<PathBuf>, destination: Option<&Path>) {
        self.outcomes.push(Outcome {
            path: path.into(),
            status: Status::Success,
            destination: destination.map(Path::to_path_buf),
            error: None,
        });
    }

    /// Record a failure. `path` is `None` for failures not tied to a file,
    /// such as an unreadable directory entry.
    pub fn failure(&mut self, path: Option<&Path>, error: &impl Debug) {
        self.outcomes.push(Outcome {
            path: path.map(Path::to_path_buf).unwrap_or_default(),
            status: Status::Failure,
            destination: None,
            error: Some(format!("{error:?}")),
        });
    }

    pub fn outcomes(&self) -> &[Outcome] {
        &self.outcomes
    }

    pub fn successes(&self) -> usize {
        self.outcomes.iter().filter(|o| o.status == Status::Success).count()
    }

    pub fn failures(&self) -> usize {
        self.outcomes.iter().filter(|o| o.status == Status::Failure).count()
    }

    pub fn has_failures(&self) -> bool {
        self.failures() > 0
    }

    /// Write every outcome as one line of JSON.
    pub fn write(&self, path: impl AsRef<Path>) -> io::Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut writer = BufWriter::new(File::create(path)?);
        for outcome in &self.outcomes {
            serde_json::to_writer(&mut writer, outcome)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()
    }
}
