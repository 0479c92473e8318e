//! Content checksums.
//!
//! A file's identity in the library is the SHA-256 digest of its bytes and
//! nothing else: not its name, location or timestamps. Every caller (import,
//! target verification, audit) must go through [`checksum_reader`] so the
//! digest is computed with the same block-sized reads everywhere.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use tracing::instrument;

/// Number of bytes read per block while hashing.
pub const BLOCK_SIZE: usize = 64 * 1024;

/// Hash everything `reader` yields until end-of-stream, returning the
/// lowercase hex SHA-256 digest.
pub fn checksum_reader(mut reader: impl Read) -> io::Result<String> {
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; BLOCK_SIZE];
    loop {
        let read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buffer[..read]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Compute the checksum of the file at `path` (absolute, or relative to the
/// current directory).
///
/// Hashing is blocking I/O, so it runs on Tokio's blocking thread pool.
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub async fn checksum(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref().to_path_buf();
    let task_path = path.clone();
    let hashed = tokio::task::spawn_blocking(move || {
        let file = File::open(&task_path)?;
        checksum_reader(file)
    })
    .await
    .or_raise(|| ErrorKind::Task)?;
    Ok(hashed.map_err(|e| ErrorKind::from_io(e, &path))?)
}
