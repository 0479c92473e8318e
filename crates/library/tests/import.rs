mod common;

use common::{Workspace, iphone_photo};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use strata_library::Context;
use strata_library::error::ErrorKind;
use strata_library::import::{Action, ImportOptions};
use strata_manifest::WriteOptions;
use strata_media::StaticSource;
use strata_storage::Transfer;
use time::macros::datetime;

const PATTERN: &str = r#"%date/%album|"Unsorted""#;

fn ctx(pattern: &str) -> Context {
    Context::new(pattern, 2).unwrap()
}

#[tokio::test]
async fn test_imports_dated_photo() {
    let mut ws = Workspace::new();
    let source = ws.add("DCIM/IMG_0001.jpg", iphone_photo());

    let run = ws.import(&mut StaticSource::default(), &ctx(PATTERN), ImportOptions::default()).await;
    assert!(run.completed());
    assert!(run.errors().is_empty());

    let expected = PathBuf::from("2020-03-04/Unsorted/2020-03-04_10-20-30-iphone-img_0001.jpg");
    let imported = run.imported();
    assert_eq!(imported.len(), 1);
    assert_eq!(imported[0].action, Action::Copied(expected.clone()));
    assert_eq!(ws.library_files(), vec![expected.clone()]);
    assert!(source.exists());

    let entry = ws.manifest.get(&imported[0].checksum).unwrap();
    assert_eq!(entry.target.relative_path(), expected);
    let record = &entry.sources[&source.to_string_lossy().into_owned()];
    assert_eq!(record.origin.as_deref(), Some("iphone"));
    assert_eq!(record.date_taken, Some(datetime!(2020-03-04 10:20:30)));

    // Copies carry the capture time.
    let modified = std::fs::metadata(ws.in_library(&expected)).unwrap().modified().unwrap();
    let captured = SystemTime::UNIX_EPOCH + Duration::from_secs(datetime!(2020-03-04 10:20:30 UTC).unix_timestamp() as u64);
    assert_eq!(modified, captured);
}

#[tokio::test]
async fn test_reimport_is_idempotent() {
    let mut ws = Workspace::new();
    ws.add("IMG_0001.jpg", iphone_photo());
    let ctx = ctx(PATTERN);
    let mut extractor = StaticSource::default();

    ws.import(&mut extractor, &ctx, ImportOptions::default()).await;
    let first = ws.manifest.write(WriteOptions::default()).unwrap();
    let first = std::fs::read(first).unwrap();

    let run = ws.import(&mut extractor, &ctx, ImportOptions::default()).await;
    assert!(run.completed());
    assert_eq!(run.imported()[0].action, Action::Skipped);
    let second = std::fs::read(ws.manifest.write(WriteOptions::default()).unwrap()).unwrap();
    assert_eq!(first, second);
    assert_eq!(ws.library_files().len(), 1);
}

#[tokio::test]
async fn test_duplicate_content_records_every_source() {
    let mut ws = Workspace::new();
    let first = ws.add("a/IMG_0001.jpg", iphone_photo());
    let second = ws.add("b/IMG_0001.jpg", iphone_photo());

    let run = ws.import(&mut StaticSource::default(), &ctx(PATTERN), ImportOptions::default()).await;
    let mut actions: Vec<_> = run.imported().iter().map(|import| import.action.clone()).collect();
    actions.sort_by_key(|action| matches!(action, Action::Skipped));
    assert!(matches!(actions[0], Action::Copied(_)));
    assert_eq!(actions[1], Action::Skipped);

    assert_eq!(ws.manifest.len(), 1);
    let (_, entry) = ws.manifest.iter().next().unwrap();
    let sources: Vec<_> = entry.sources.keys().cloned().collect();
    assert_eq!(sources, vec![first.to_string_lossy().into_owned(), second.to_string_lossy().into_owned()]);
    assert_eq!(ws.library_files().len(), 1);
}

#[tokio::test]
async fn test_allowed_duplicate_is_already_present() {
    let mut ws = Workspace::new();
    ws.add("IMG_0001.jpg", iphone_photo());
    let ctx = ctx(PATTERN);
    let mut extractor = StaticSource::default();
    ws.import(&mut extractor, &ctx, ImportOptions::default()).await;

    let options = ImportOptions { allow_duplicates: true, ..Default::default() };
    let run = ws.import(&mut extractor, &ctx, options).await;
    assert!(matches!(run.imported()[0].action, Action::AlreadyPresent(_)));
    assert_eq!(ws.library_files().len(), 1);
}

#[tokio::test]
async fn test_collision_keeps_both_files() {
    let mut ws = Workspace::new();
    ws.add("a/IMG_0001.jpg", iphone_photo());
    let mut other = iphone_photo();
    other["EXIF:Make"] = json!("Apple");
    ws.add("b/IMG_0001.jpg", other);

    let run = ws.import(&mut StaticSource::default(), &ctx(PATTERN), ImportOptions::default()).await;
    assert!(run.errors().is_empty());
    let diverged = run
        .imported()
        .into_iter()
        .find(|import| matches!(import.action, Action::Diverged(_)))
        .expect("second file placed alongside the first");
    let expected = format!("2020-03-04/Unsorted/2020-03-04_10-20-30-iphone-img_0001.{}.jpg", diverged.checksum);
    assert_eq!(diverged.action.destination(), Some(Path::new(&expected)));
    assert_eq!(ws.library_files().len(), 2);
    // The new content is recorded under the name it actually got.
    assert_eq!(ws.manifest.get(&diverged.checksum).unwrap().target.relative_path(), PathBuf::from(expected));
}

#[tokio::test]
async fn test_dry_run_leaves_filesystem_alone() {
    let mut ws = Workspace::new();
    ws.add("IMG_0001.jpg", iphone_photo());
    let options = ImportOptions { dry_run: true, ..Default::default() };

    let run = ws.import(&mut StaticSource::default(), &ctx(PATTERN), options).await;
    let planned = PathBuf::from("2020-03-04/Unsorted/2020-03-04_10-20-30-iphone-img_0001.jpg");
    assert_eq!(run.imported()[0].action, Action::Planned(planned));
    assert!(ws.library_files().is_empty());
    assert_eq!(ws.manifest.len(), 1);
}

#[tokio::test]
async fn test_move_removes_source() {
    let mut ws = Workspace::new();
    let source = ws.add("IMG_0001.jpg", iphone_photo());
    let options = ImportOptions { transfer: Transfer::Move, ..Default::default() };

    let run = ws.import(&mut StaticSource::default(), &ctx(PATTERN), options).await;
    assert!(matches!(run.imported()[0].action, Action::Moved(_)));
    assert!(!source.exists());
    assert_eq!(ws.library_files().len(), 1);
}

#[tokio::test]
async fn test_undated_is_flattened() {
    let mut ws = Workspace::new();
    ws.add("scan.png", json!({"XMP:Album": "Family"}));

    let run = ws.import(&mut StaticSource::default(), &ctx("%date/%date/%album"), ImportOptions::default()).await;
    assert!(run.errors().is_empty());
    assert_eq!(ws.library_files(), vec![PathBuf::from("undated/Family/scan.png")]);
}

#[tokio::test]
async fn test_file_errors_do_not_stop_the_run() {
    let mut ws = Workspace::new();
    ws.add("IMG_0001.jpg", iphone_photo());
    let unsupported = ws.add("notes.xyz", json!({}));
    ws.add("strata.json", json!({"sources": []}));

    let run = ws.import(&mut StaticSource::default(), &ctx(PATTERN), ImportOptions::default()).await;
    assert!(run.completed());
    assert_eq!(run.imported().len(), 1);
    let errors = run.errors();
    assert_eq!(errors.len(), 1);
    assert!(matches!(&**errors[0], ErrorKind::Import(path) if *path == unsupported));
    assert_eq!(errors[0].path(), Some(unsupported.as_path()));
}

#[tokio::test]
async fn test_metadata_failure_is_fatal() {
    let mut ws = Workspace::new();
    ws.add("IMG_0001.jpg", iphone_photo());

    let run = ws.import(&mut StaticSource::failing(), &ctx(PATTERN), ImportOptions::default()).await;
    assert!(!run.completed());
    let errors = run.errors();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].is_fatal());
    assert!(ws.library_files().is_empty());
    assert!(ws.manifest.is_empty());
}
