//! End-to-end job tests with a fake downloader, decoder, and catalog.

mod common;

use std::fs::File;

use stillshot::{FailureKind, SamplingJob, SamplingOptions, SamplingStrategy};
use zip::ZipArchive;

use common::{CatalogCall, FakeCatalog, FakeDownloader, FakeOpener, file_names, talk_stream};

const URL: &str = "https://example.com/watch?v=abc123";

#[test]
fn archive_job_lays_out_the_working_directory() {
    let work = tempfile::tempdir().unwrap();
    let job = SamplingJob::new(
        FakeDownloader::new("abc123", "A talk"),
        FakeOpener::new(talk_stream()),
        work.path(),
    );

    let outcome = job.archive(URL, 30.0).unwrap();

    assert_eq!(outcome.media.path, work.path().join("downloads").join("abc123.mp4"));
    assert_eq!(outcome.output_dir, work.path().join("abc123"));
    assert_eq!(outcome.archive.as_deref(), Some(work.path().join("abc123.zip").as_path()));
    assert_eq!(outcome.stream_info, talk_stream());
    assert_eq!(outcome.report.extracted(), 4);
    assert!(outcome.catalog_folder.is_none());

    let archive = ZipArchive::new(File::open(work.path().join("abc123.zip")).unwrap()).unwrap();
    let files = archive.file_names().filter(|name| name.ends_with(".png")).count();
    assert_eq!(files, 4);
}

#[test]
fn archive_job_with_no_points_packs_an_empty_folder() {
    let work = tempfile::tempdir().unwrap();
    let job = SamplingJob::new(
        FakeDownloader::new("short", ""),
        FakeOpener::new(talk_stream()),
        work.path(),
    );

    let outcome = job.archive(URL, 500.0).unwrap();

    assert_eq!(outcome.report.total_points, 0);
    assert!(work.path().join("short.zip").is_file());
    assert!(file_names(&outcome.output_dir).is_empty());
}

#[test]
fn rerunning_a_job_replaces_the_previous_output() {
    let work = tempfile::tempdir().unwrap();
    let job = SamplingJob::new(
        FakeDownloader::new("abc123", "A talk"),
        FakeOpener::new(talk_stream()),
        work.path(),
    );

    let first = job.archive(URL, 30.0).unwrap();
    assert_eq!(first.report.extracted(), 4);
    let second = job.archive(URL, 60.0).unwrap();

    let expected: Vec<String> = second
        .report
        .results
        .iter()
        .map(|result| format!("abc123/{}.png", result.label))
        .collect();
    assert_eq!(expected, ["abc123/00_00_00.png", "abc123/00_01_00.png"]);

    let archive = ZipArchive::new(File::open(work.path().join("abc123.zip")).unwrap()).unwrap();
    let mut entries: Vec<String> = archive
        .file_names()
        .filter(|name| name.ends_with(".png"))
        .map(str::to_string)
        .collect();
    entries.sort();
    assert_eq!(entries, expected);
    assert_eq!(
        file_names(&second.output_dir),
        ["00_00_00.png", "00_01_00.png"]
    );
}

#[test]
fn results_carry_the_source_url() {
    let work = tempfile::tempdir().unwrap();
    let options = SamplingOptions::new().with_strategy(SamplingStrategy::RandomSeek);
    let job = SamplingJob::new(
        FakeDownloader::new("abc123", "A talk"),
        FakeOpener::new(talk_stream()),
        work.path(),
    )
    .with_options(options);

    let outcome = job.extract(URL, 60.0).unwrap();

    assert_eq!(
        file_names(&outcome.output_dir),
        ["000000_0.png", "000060_0.png", "000120_0.png"]
    );
    assert!(outcome.report.results.iter().all(|result| result.source_url == URL));
}

#[test]
fn catalog_job_registers_video_then_frames() {
    let work = tempfile::tempdir().unwrap();
    let catalog = FakeCatalog::default();
    let job = SamplingJob::new(
        FakeDownloader::new("abc123", "A talk"),
        FakeOpener::new(talk_stream()),
        work.path(),
    );

    let outcome = job.catalog(URL, 60.0, &catalog).unwrap();

    assert_eq!(outcome.catalog_folder.as_deref(), Some("folder-1"));
    assert!(outcome.archive.is_none());
    assert_eq!(
        catalog.calls(),
        [
            CatalogCall::CreateFolder("A talk".to_string()),
            CatalogCall::AddItem {
                path: work.path().join("downloads").join("abc123.mp4"),
                label: "A talk".to_string(),
                folder_id: "folder-1".to_string(),
            },
            CatalogCall::AddItems {
                labels: vec!["00_00_00".to_string(), "00_01_00".to_string()],
                folder_id: "folder-1".to_string(),
            },
        ]
    );
}

#[test]
fn untitled_video_uses_its_id_as_folder_name() {
    let work = tempfile::tempdir().unwrap();
    let catalog = FakeCatalog::default();
    let job = SamplingJob::new(
        FakeDownloader::new("abc123", "  "),
        FakeOpener::new(talk_stream()),
        work.path(),
    );

    job.catalog(URL, 60.0, &catalog).unwrap();

    assert_eq!(catalog.calls()[0], CatalogCall::CreateFolder("abc123".to_string()));
}

#[test]
fn failed_download_is_an_acquisition_error() {
    let work = tempfile::tempdir().unwrap();
    let mut downloader = FakeDownloader::new("abc123", "A talk");
    downloader.fail = true;
    let opener = FakeOpener::new(talk_stream());
    let job = SamplingJob::new(downloader, opener.clone(), work.path());

    let error = job.archive(URL, 30.0).unwrap_err();

    assert_eq!(error.kind(), FailureKind::Acquisition);
    assert_eq!(opener.open_count(), 0);
    assert!(!work.path().join("abc123.zip").exists());
}

#[test]
fn catalog_failure_keeps_extracted_frames() {
    let work = tempfile::tempdir().unwrap();
    let catalog = FakeCatalog {
        reject_items: true,
        ..FakeCatalog::default()
    };
    let job = SamplingJob::new(
        FakeDownloader::new("abc123", "A talk"),
        FakeOpener::new(talk_stream()),
        work.path(),
    );

    let error = job.catalog(URL, 60.0, &catalog).unwrap_err();

    assert_eq!(error.kind(), FailureKind::Packaging);
    assert_eq!(
        file_names(&work.path().join("abc123")),
        ["00_00_00.png", "00_01_00.png"]
    );
}
