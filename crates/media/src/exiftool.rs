//! A long-lived ExifTool process in `-stay_open` mode.
//!
//! Starting ExifTool (a Perl program) is slow, so one process is started per
//! run and fed one request per batch: arguments one per line on stdin,
//! terminated by `-execute`. ExifTool answers on stdout and marks the end of
//! every answer with a `{ready}` line.

use crate::error::{ErrorKind, Result};
use crate::metadata::MediaMetadata;
use crate::source::{MetadataBatch, MetadataSource, TagUpdate};
use async_trait::async_trait;
use exn::{Exn, OptionExt, ResultExt};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::instrument;

const READY: &str = "{ready}";
/// How long ExifTool gets to exit by itself before it is killed.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct ExifToolOptions {
    /// Executable; looked up on `PATH` when given as a bare name.
    pub program: PathBuf,
    /// Passed as `-config`, for custom tag definitions.
    pub config_file: Option<PathBuf>,
    /// Per-request limit. A request that exceeds it leaves the process
    /// unusable.
    pub timeout: Option<Duration>,
}
impl Default for ExifToolOptions {
    fn default() -> Self {
        Self { program: PathBuf::from("exiftool"), config_file: None, timeout: None }
    }
}

pub struct ExifTool {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    timeout: Option<Duration>,
    waiting: Duration,
    usable: bool,
}

impl ExifTool {
    /// Start the process. Must be called from within a Tokio runtime.
    #[instrument(skip_all, fields(program = %options.program.display()))]
    pub fn spawn(options: ExifToolOptions) -> Result<Self> {
        let program = locate(&options.program)?;
        let mut command = Command::new(&program);
        // `-config` is only honored as the very first argument.
        if let Some(config_file) = &options.config_file {
            command.arg("-config").arg(config_file);
        }
        command
            .args(["-stay_open", "True", "-@", "-"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        let mut child = command.spawn().or_raise(|| ErrorKind::Spawn)?;
        let stdin = child.stdin.take().ok_or_raise(|| ErrorKind::Spawn)?;
        let stdout = child.stdout.take().ok_or_raise(|| ErrorKind::Spawn)?;
        tracing::debug!(program = %program.display(), pid = child.id(), "Started ExifTool");
        Ok(Self {
            child,
            stdin,
            stdout: BufReader::new(stdout),
            timeout: options.timeout,
            waiting: Duration::ZERO,
            usable: true,
        })
    }

    async fn request(&mut self, arguments: &[String]) -> Result<String> {
        if !self.usable {
            exn::bail!(ErrorKind::Closed);
        }
        let started = Instant::now();
        let result = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, self.exchange(arguments)).await {
                Ok(result) => result,
                Err(_) => Err(Exn::from(ErrorKind::Timeout(limit))),
            },
            None => self.exchange(arguments).await,
        };
        self.waiting += started.elapsed();
        if result.is_err() {
            // Whatever ExifTool writes next can no longer be matched to a request.
            self.usable = false;
        }
        result
    }

    async fn exchange(&mut self, arguments: &[String]) -> Result<String> {
        let mut request = arguments.iter().fold(String::new(), |mut request, argument| {
            request.push_str(argument);
            request.push('\n');
            request
        });
        request.push_str("-execute\n");
        self.stdin.write_all(request.as_bytes()).await.or_raise(|| ErrorKind::Io)?;
        self.stdin.flush().await.or_raise(|| ErrorKind::Io)?;

        let mut output = String::new();
        loop {
            let mut line = String::new();
            if self.stdout.read_line(&mut line).await.or_raise(|| ErrorKind::Io)? == 0 {
                // End of stream: the process went away mid-request.
                exn::bail!(ErrorKind::Io);
            }
            if line.trim_end() == READY {
                return Ok(output);
            }
            output.push_str(&line);
        }
    }
}

#[async_trait]
impl MetadataSource for ExifTool {
    #[instrument(skip_all, fields(files = paths.len()))]
    async fn extract(&mut self, paths: &[PathBuf]) -> Result<MetadataBatch> {
        if paths.is_empty() {
            return Ok(MetadataBatch::new());
        }
        let mut arguments: Vec<String> = ["-json", "-G", "-charset", "filename=utf8"].map(String::from).to_vec();
        arguments.extend(paths.iter().map(|path| path.to_string_lossy().into_owned()));
        let output = self.request(&arguments).await?;
        if output.trim().is_empty() {
            return Ok(MetadataBatch::new());
        }
        let objects: Vec<Value> = serde_json::from_str(&output).or_raise(|| ErrorKind::Protocol)?;
        let requested: HashMap<String, &PathBuf> =
            paths.iter().map(|path| (path.to_string_lossy().into_owned(), path)).collect();
        let batch: MetadataBatch = objects
            .iter()
            .filter_map(|object| {
                let source = object.get("SourceFile")?.as_str()?;
                let path = requested.get(source).map(|path| (*path).clone()).unwrap_or_else(|| PathBuf::from(source));
                let metadata = MediaMetadata::from_exiftool(&path, object);
                Some((path, metadata))
            })
            .collect();
        tracing::debug!(requested = paths.len(), extracted = batch.len(), "Extracted metadata batch");
        Ok(batch)
    }

    #[instrument(skip_all, fields(path = %path.display()))]
    async fn write(&mut self, path: &Path, updates: &[TagUpdate]) -> Result<()> {
        let mut arguments = vec!["-overwrite_original".to_string()];
        arguments.extend(updates.iter().flat_map(TagUpdate::exiftool_arguments));
        arguments.push(path.to_string_lossy().into_owned());
        let output = self.request(&arguments).await?;
        let accepted = output.lines().map(str::trim).any(|line| {
            line == "1 image files updated" || line == "1 image files unchanged"
        });
        if !accepted {
            tracing::warn!(response = output.trim(), "ExifTool did not update file");
            exn::bail!(ErrorKind::WriteRejected(path.to_path_buf()));
        }
        Ok(())
    }

    fn waiting_time(&self) -> Duration {
        self.waiting
    }

    async fn shutdown(self) -> Result<()> {
        let Self { mut child, mut stdin, waiting, .. } = self;
        if stdin.write_all(b"-stay_open\nFalse\n").await.is_ok() {
            _ = stdin.flush().await;
        }
        drop(stdin);
        match tokio::time::timeout(SHUTDOWN_GRACE, child.wait()).await {
            Ok(status) => {
                status.or_raise(|| ErrorKind::Io)?;
            },
            Err(_) => {
                tracing::warn!("ExifTool did not exit in time; killing it");
                child.kill().await.or_raise(|| ErrorKind::Io)?;
            },
        }
        tracing::debug!(waiting = ?waiting, "ExifTool stopped");
        Ok(())
    }
}

/// Resolve the executable: explicit paths must exist, bare names are looked
/// up on `PATH`.
fn locate(program: &Path) -> Result<PathBuf> {
    if program.is_absolute() || program.components().count() > 1 {
        if program.is_file() {
            return Ok(program.to_path_buf());
        }
        exn::bail!(ErrorKind::NotInstalled(program.to_path_buf()));
    }
    which::which(program).or_raise(|| ErrorKind::NotInstalled(program.to_path_buf()))
}
