//! Single-point frame extraction.
//!
//! [`FrameExtractor::extract`] positions a decoder at one [`SamplePoint`]
//! and reads the frame there. Frame points seek by index
//! (sequential-scan); timestamp points are converted to milliseconds and
//! seek by time (random-seek). Each call is independent of every other, so
//! points can be extracted in any order or on any worker.

use std::path::{Path, PathBuf};

use image::DynamicImage;
use serde::Serialize;

use crate::config::ImageFormat;
use crate::decoder::{DecoderPosition, VideoDecoder};
use crate::error::ExtractionError;
use crate::sampler::{LabelStyle, SamplePoint};

/// Record for one successfully extracted sample point.
///
/// `tags` and `annotation` are always `None` when produced by the
/// extractor; they exist so callers can enrich records before handing them
/// to an [`AssetCatalog`](crate::AssetCatalog).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractionResult {
    /// Position of the point in the job's sample sequence.
    pub sample_index: usize,
    /// Where the frame was written.
    pub image_path: PathBuf,
    /// Deterministic label derived from the point's time value.
    pub label: String,
    /// URL the video was acquired from.
    pub source_url: String,
    /// Catalog tags.
    pub tags: Option<Vec<String>>,
    /// Catalog annotation.
    pub annotation: Option<String>,
}

/// Writes frames for one job's output directory.
#[derive(Debug, Clone)]
pub struct FrameExtractor {
    output_dir: PathBuf,
    source_url: String,
    image_format: ImageFormat,
    label_style: LabelStyle,
}

impl FrameExtractor {
    /// Create an extractor writing into `output_dir`.
    pub fn new(
        output_dir: impl Into<PathBuf>,
        source_url: impl Into<String>,
        image_format: ImageFormat,
        label_style: LabelStyle,
    ) -> Self {
        Self {
            output_dir: output_dir.into(),
            source_url: source_url.into(),
            image_format,
            label_style,
        }
    }

    /// Directory frames are written to.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Label for `point` under this extractor's style.
    pub fn label(&self, point: &SamplePoint) -> String {
        point.label(self.label_style)
    }

    /// Path the frame for `point` is written to.
    pub fn image_path(&self, point: &SamplePoint) -> PathBuf {
        self.output_dir
            .join(format!("{}.{}", self.label(point), self.image_format.extension()))
    }

    /// Decode the frame at `point`.
    ///
    /// # Errors
    ///
    /// [`ExtractionError::EndOfStream`] when the decoder has no frame there,
    /// [`ExtractionError::DecodeFailure`] when seeking or decoding fails.
    pub fn extract<D: VideoDecoder + ?Sized>(
        decoder: &mut D,
        point: &SamplePoint,
    ) -> Result<DynamicImage, ExtractionError> {
        let position = match *point {
            SamplePoint::Frame { number, .. } => DecoderPosition::Frame(number),
            SamplePoint::Timestamp { seconds } => {
                DecoderPosition::Milliseconds((seconds.max(0.0) * 1000.0).round() as u64)
            }
        };
        decoder.set_position(position)?;
        decoder.read_frame()?.ok_or(ExtractionError::EndOfStream)
    }

    /// Decode the frame at `point` and write it to [`image_path`](Self::image_path).
    ///
    /// # Errors
    ///
    /// Anything [`extract`](Self::extract) returns, or
    /// [`ExtractionError::WriteFailure`] if the image cannot be saved.
    pub fn extract_to_file<D: VideoDecoder + ?Sized>(
        &self,
        decoder: &mut D,
        sample_index: usize,
        point: &SamplePoint,
    ) -> Result<ExtractionResult, ExtractionError> {
        let image = Self::extract(decoder, point)?;
        let image_path = self.image_path(point);
        image
            .save_with_format(&image_path, self.image_format.to_image_format())
            .map_err(|error| ExtractionError::WriteFailure {
                path: image_path.clone(),
                reason: error.to_string(),
            })?;

        Ok(ExtractionResult {
            sample_index,
            image_path,
            label: self.label(point),
            source_url: self.source_url.clone(),
            tags: None,
            annotation: None,
        })
    }
}
