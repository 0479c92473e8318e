//! Read-only views of manifests, and merging them.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::path::{Path, PathBuf};
use strata_manifest::Manifest;

/// Load a manifest that has to exist already.
fn load_existing(path: &Path) -> Result<Manifest> {
    if !path.is_file() {
        exn::bail!(ErrorKind::Usage(format!("no manifest at {}", path.display())));
    }
    Manifest::load(path).or_raise(|| ErrorKind::Manifest)
}

/// Print how many hashes were seen at more than one source path.
pub fn analyze(path: &Path) -> Result<bool> {
    let manifest = load_existing(path)?;
    println!("{} hashes", manifest.len());
    for (sources, hashes) in manifest.duplicate_histogram() {
        println!("{hashes:>8} with {sources} sources");
    }
    Ok(true)
}

pub fn merge(inputs: &[PathBuf], output: &Path, indent: bool) -> Result<bool> {
    let mut merged = Manifest::new(output);
    for input in inputs {
        let added = merged.absorb(load_existing(input)?);
        tracing::info!(input = %input.display(), added, "Merged manifest");
    }
    merged.write_to(output, indent).or_raise(|| ErrorKind::Manifest)?;
    Ok(true)
}

/// Print each entry whose library file is called `name`, as its hash
/// followed by the entry itself.
pub fn find(path: &Path, name: &str) -> Result<bool> {
    let manifest = load_existing(path)?;
    let mut found = 0;
    for (checksum, entry) in manifest.find_by_name(name) {
        let entry = serde_json::to_string_pretty(entry).or_raise(|| ErrorKind::Output)?;
        println!("{checksum}\n{entry}");
        found += 1;
    }
    tracing::debug!(name, found, "Searched manifest");
    Ok(true)
}
