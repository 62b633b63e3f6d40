//! Archive and catalog packaging integration tests.

mod common;

use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::Read;
use std::path::Path;

use stillshot::{ExtractionResult, FailureKind, pack, register};
use zip::ZipArchive;

use common::{CatalogCall, FakeCatalog};

fn entry_names(archive_path: &Path) -> BTreeSet<String> {
    let mut archive = ZipArchive::new(File::open(archive_path).unwrap()).unwrap();
    (0..archive.len())
        .map(|index| archive.by_index(index).unwrap().name().to_string())
        .collect()
}

fn result(index: usize, label: &str) -> ExtractionResult {
    ExtractionResult {
        sample_index: index,
        image_path: format!("/frames/{label}.png").into(),
        label: label.to_string(),
        source_url: "https://example.com/talk".to_string(),
        tags: None,
        annotation: None,
    }
}

// ── pack ───────────────────────────────────────────────────────────

#[test]
fn archive_contains_every_file_under_the_output_folder() {
    let work = tempfile::tempdir().unwrap();
    let output_dir = work.path().join("abc123");
    fs::create_dir_all(output_dir.join("extra")).unwrap();
    fs::write(output_dir.join("00_00_00.png"), b"first").unwrap();
    fs::write(output_dir.join("00_00_30.png"), b"second").unwrap();
    fs::write(output_dir.join("extra").join("notes.txt"), b"nested").unwrap();

    let archive_path = pack(&output_dir).unwrap();

    assert_eq!(archive_path, work.path().join("abc123.zip"));
    let names = entry_names(&archive_path);
    for expected in [
        "abc123/00_00_00.png",
        "abc123/00_00_30.png",
        "abc123/extra/notes.txt",
    ] {
        assert!(names.contains(expected), "missing {expected} in {names:?}");
    }
    assert!(names.iter().all(|name| name.starts_with("abc123/")));
}

#[test]
fn archived_files_keep_their_contents() {
    let work = tempfile::tempdir().unwrap();
    let output_dir = work.path().join("job");
    fs::create_dir_all(&output_dir).unwrap();
    fs::write(output_dir.join("000012_5.png"), b"pixels").unwrap();

    let archive_path = pack(&output_dir).unwrap();

    let mut archive = ZipArchive::new(File::open(archive_path).unwrap()).unwrap();
    let mut contents = Vec::new();
    archive
        .by_name("job/000012_5.png")
        .unwrap()
        .read_to_end(&mut contents)
        .unwrap();
    assert_eq!(contents, b"pixels");
}

#[test]
fn empty_output_folder_still_packs() {
    let work = tempfile::tempdir().unwrap();
    let output_dir = work.path().join("empty");
    fs::create_dir_all(&output_dir).unwrap();

    let archive_path = pack(&output_dir).unwrap();

    assert_eq!(entry_names(&archive_path), BTreeSet::from(["empty/".to_string()]));
}

#[test]
fn missing_directory_is_a_packaging_error() {
    let work = tempfile::tempdir().unwrap();
    let error = pack(&work.path().join("nowhere")).unwrap_err();
    assert_eq!(error.kind(), FailureKind::Packaging);
}

#[test]
fn packaging_failure_leaves_images_on_disk() {
    let work = tempfile::tempdir().unwrap();
    let output_dir = work.path().join("job");
    fs::create_dir_all(&output_dir).unwrap();
    fs::write(output_dir.join("00_00_00.png"), b"frame").unwrap();
    // A directory where the archive should go makes the write fail.
    fs::create_dir_all(work.path().join("job.zip")).unwrap();

    let error = pack(&output_dir).unwrap_err();

    assert_eq!(error.kind(), FailureKind::Packaging);
    assert!(error.to_string().contains("job.zip"), "{error}");
    assert!(output_dir.join("00_00_00.png").is_file());
}

// ── register ───────────────────────────────────────────────────────

#[test]
fn register_adds_results_in_one_batch() {
    let catalog = FakeCatalog::default();
    let results = [result(0, "00_00_00"), result(1, "00_00_30")];

    register(&catalog, &results, "folder-7").unwrap();

    assert_eq!(
        catalog.calls(),
        [CatalogCall::AddItems {
            labels: vec!["00_00_00".to_string(), "00_00_30".to_string()],
            folder_id: "folder-7".to_string(),
        }]
    );
}

#[test]
fn register_with_no_results_makes_no_calls() {
    let catalog = FakeCatalog::default();
    register(&catalog, &[], "folder-1").unwrap();
    assert!(catalog.calls().is_empty());
}

#[test]
fn catalog_rejection_is_a_packaging_failure() {
    let catalog = FakeCatalog {
        reject_items: true,
        ..FakeCatalog::default()
    };
    let error = register(&catalog, &[result(0, "00_00_00")], "folder-1").unwrap_err();
    assert_eq!(error.kind(), FailureKind::Packaging);
}
