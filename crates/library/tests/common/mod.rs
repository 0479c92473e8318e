#![allow(dead_code)]

use futures::StreamExt;
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use strata_library::Context;
use strata_library::error::Error;
use strata_library::import::{Import, ImportEvent, ImportOptions, import};
use strata_manifest::Manifest;
use strata_media::StaticSource;
use strata_storage::BackendHandle;
use strata_storage::backend::LocalBackend;
use tempfile::TempDir;

/// A source tree, an empty library and a manifest, all inside one temporary
/// directory. Media files contain their own tags as JSON, which is what
/// [`StaticSource`] reads and writes.
pub struct Workspace {
    pub dir: TempDir,
    pub source: BackendHandle,
    pub library: BackendHandle,
    pub manifest: Manifest,
}

impl Workspace {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("in")).unwrap();
        let source: BackendHandle = Arc::new(LocalBackend::open("in", dir.path().join("in")).unwrap());
        let library: BackendHandle = Arc::new(LocalBackend::new("library", dir.path().join("library")).unwrap());
        let manifest = Manifest::load(dir.path().join("manifest.json")).unwrap();
        Self { dir, source, library, manifest }
    }

    /// Write a source file whose content is `tags`.
    pub fn add(&self, relative: &str, tags: Value) -> PathBuf {
        let path = self.source.root().join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, serde_json::to_vec(&tags).unwrap()).unwrap();
        path
    }

    pub fn in_library(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.library.root().join(relative)
    }

    /// Every file in the library, relative to its root, sorted.
    pub fn library_files(&self) -> Vec<PathBuf> {
        fn walk(root: &Path, dir: &Path, files: &mut Vec<PathBuf>) {
            for entry in std::fs::read_dir(dir).unwrap() {
                let path = entry.unwrap().path();
                if path.is_dir() {
                    walk(root, &path, files);
                } else {
                    files.push(path.strip_prefix(root).unwrap().to_path_buf());
                }
            }
        }
        let mut files = Vec::new();
        walk(self.library.root(), self.library.root(), &mut files);
        files.sort();
        files
    }

    pub async fn import(&mut self, extractor: &mut StaticSource, ctx: &Context, options: ImportOptions) -> Run {
        let events: Vec<_> =
            import(&self.source, &self.library, &mut self.manifest, extractor, ctx, &options).collect().await;
        Run { events }
    }
}

pub struct Run {
    pub events: Vec<Result<ImportEvent, Error>>,
}

impl Run {
    pub fn imported(&self) -> Vec<&Import> {
        self.events
            .iter()
            .filter_map(|event| match event {
                Ok(ImportEvent::Imported(import)) => Some(import),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<&Error> {
        self.events.iter().filter_map(|event| event.as_ref().err()).collect()
    }

    pub fn completed(&self) -> bool {
        matches!(self.events.last(), Some(Ok(ImportEvent::Complete)))
    }
}

/// Tags of a photo taken with an iPhone on 2020-03-04 at 10:20:30.
pub fn iphone_photo() -> Value {
    json!({
        "EXIF:DateTimeOriginal": "2020:03:04 10:20:30",
        "EXIF:Model": "iPhone 11",
        "XMP:Origin": "iphone",
    })
}
