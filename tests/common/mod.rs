//! Scripted collaborators shared by the integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use image::{DynamicImage, Rgb, RgbImage};
use stillshot::{
    AssetCatalog, DecoderOpener, DecoderPosition, DownloadedMedia, ExtractionError,
    ExtractionResult, MediaDownloader, MediaInfo, ProgressEvent, ProgressObserver,
    StillshotError, StreamInfo, VideoDecoder,
};

/// The 130 second, 30 fps stream used throughout the tests.
pub fn talk_stream() -> StreamInfo {
    StreamInfo::new(130.0, 30.0, 3900)
}

/// A decoder that paints a solid frame for every position inside the
/// stream and fails on request.
#[derive(Debug)]
pub struct FakeDecoder {
    info: StreamInfo,
    failing: Vec<DecoderPosition>,
    position: Option<DecoderPosition>,
    reads: Arc<AtomicUsize>,
}

impl FakeDecoder {
    fn in_stream(&self, position: DecoderPosition) -> bool {
        match position {
            DecoderPosition::Frame(number) => number < self.info.total_frames,
            DecoderPosition::Milliseconds(millis) => {
                (millis as f64) < self.info.duration_seconds * 1000.0
            }
        }
    }
}

impl VideoDecoder for FakeDecoder {
    fn stream_info(&self) -> StreamInfo {
        self.info
    }

    fn set_position(&mut self, position: DecoderPosition) -> Result<(), ExtractionError> {
        self.position = Some(position);
        Ok(())
    }

    fn read_frame(&mut self) -> Result<Option<DynamicImage>, ExtractionError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let Some(position) = self.position.take() else {
            return Ok(None);
        };
        if self.failing.contains(&position) {
            return Err(ExtractionError::DecodeFailure(format!(
                "corrupt segment at {position:?}"
            )));
        }
        if !self.in_stream(position) {
            return Ok(None);
        }
        let shade = match position {
            DecoderPosition::Frame(number) => (number % 256) as u8,
            DecoderPosition::Milliseconds(millis) => (millis / 1000 % 256) as u8,
        };
        Ok(Some(DynamicImage::ImageRgb8(RgbImage::from_pixel(
            4,
            4,
            Rgb([shade, 0, 255 - shade]),
        ))))
    }
}

/// Opens [`FakeDecoder`]s and counts how often it was asked to.
#[derive(Debug, Clone)]
pub struct FakeOpener {
    pub info: StreamInfo,
    pub failing: Vec<DecoderPosition>,
    pub fail_open: bool,
    pub opened: Arc<AtomicUsize>,
    pub reads: Arc<AtomicUsize>,
}

impl FakeOpener {
    pub fn new(info: StreamInfo) -> Self {
        Self {
            info,
            failing: Vec::new(),
            fail_open: false,
            opened: Arc::new(AtomicUsize::new(0)),
            reads: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing_at(mut self, positions: impl IntoIterator<Item = DecoderPosition>) -> Self {
        self.failing.extend(positions);
        self
    }

    pub fn unopenable(mut self) -> Self {
        self.fail_open = true;
        self
    }

    pub fn open_count(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl DecoderOpener for FakeOpener {
    type Decoder = FakeDecoder;

    fn open(&self, path: &Path) -> Result<FakeDecoder, StillshotError> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        if self.fail_open {
            return Err(StillshotError::Acquisition {
                input: path.display().to_string(),
                reason: "not a video".to_string(),
            });
        }
        Ok(FakeDecoder {
            info: self.info,
            failing: self.failing.clone(),
            position: None,
            reads: Arc::clone(&self.reads),
        })
    }
}

/// Records every progress event.
#[derive(Debug, Default)]
pub struct RecordingProgress {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingProgress {
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl ProgressObserver for RecordingProgress {
    fn on_progress(&self, event: &ProgressEvent) {
        self.events.lock().unwrap().push(*event);
    }
}

/// "Downloads" by writing a placeholder file named after the id.
#[derive(Debug, Clone)]
pub struct FakeDownloader {
    pub info: MediaInfo,
    pub fail: bool,
}

impl FakeDownloader {
    pub fn new(id: &str, title: &str) -> Self {
        Self {
            info: MediaInfo {
                id: id.to_string(),
                extension: "mp4".to_string(),
                title: title.to_string(),
            },
            fail: false,
        }
    }
}

impl MediaDownloader for FakeDownloader {
    fn probe(&self, url: &str) -> Result<MediaInfo, StillshotError> {
        if self.fail {
            return Err(StillshotError::Acquisition {
                input: url.to_string(),
                reason: "unsupported URL".to_string(),
            });
        }
        Ok(self.info.clone())
    }

    fn fetch(&self, url: &str, dest_dir: &Path) -> Result<DownloadedMedia, StillshotError> {
        let info = self.probe(url)?;
        fs::create_dir_all(dest_dir).unwrap();
        let path = dest_dir.join(format!("{}.{}", info.id, info.extension));
        fs::write(&path, b"not really a video").unwrap();
        Ok(DownloadedMedia { path, info })
    }
}

/// One recorded catalog call.
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogCall {
    CreateFolder(String),
    AddItem { path: PathBuf, label: String, folder_id: String },
    AddItems { labels: Vec<String>, folder_id: String },
}

/// Records calls and hands out sequential folder ids.
#[derive(Debug, Default)]
pub struct FakeCatalog {
    pub calls: Mutex<Vec<CatalogCall>>,
    pub reject_items: bool,
}

impl FakeCatalog {
    pub fn calls(&self) -> Vec<CatalogCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl AssetCatalog for FakeCatalog {
    fn create_folder(&self, name: &str) -> Result<String, StillshotError> {
        let mut calls = self.calls.lock().unwrap();
        calls.push(CatalogCall::CreateFolder(name.to_string()));
        Ok(format!("folder-{}", calls.len()))
    }

    fn add_item(
        &self,
        path: &Path,
        label: &str,
        _source_url: &str,
        folder_id: &str,
    ) -> Result<(), StillshotError> {
        self.calls.lock().unwrap().push(CatalogCall::AddItem {
            path: path.to_path_buf(),
            label: label.to_string(),
            folder_id: folder_id.to_string(),
        });
        Ok(())
    }

    fn add_items(
        &self,
        results: &[ExtractionResult],
        folder_id: &str,
    ) -> Result<(), StillshotError> {
        if self.reject_items {
            return Err(StillshotError::Catalog("catalog is read-only".to_string()));
        }
        self.calls.lock().unwrap().push(CatalogCall::AddItems {
            labels: results.iter().map(|result| result.label.clone()).collect(),
            folder_id: folder_id.to_string(),
        });
        Ok(())
    }
}

/// Sorted file names in `dir`.
pub fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(Result::ok)
                .map(|entry| entry.file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}
