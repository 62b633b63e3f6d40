//! Extraction coordination.
//!
//! [`ExtractionCoordinator`] runs the [`FrameExtractor`] over every sample
//! point of a job, either serially on the job's own decoder or across a
//! worker pool where each worker opens its own decoder. Both modes produce
//! the same report: results ordered by sample index, plus one
//! [`ExtractionGap`] for every point that could not be captured.
//!
//! A failed point never aborts the job. Only an unopenable decoder, a
//! worker pool that cannot start, or cancellation does.

use std::path::Path;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::config::{ExecutionMode, SamplingOptions};
use crate::decoder::{DecoderOpener, VideoDecoder};
use crate::error::{ExtractionError, StillshotError};
use crate::extractor::{ExtractionResult, FrameExtractor};
use crate::parallel;
use crate::progress::ProgressReporter;
use crate::sampler::SamplePoint;

/// A sample point that was skipped.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionGap {
    /// Position of the point in the job's sample sequence.
    pub sample_index: usize,
    /// Label the frame would have had.
    pub label: String,
    /// Why it was skipped.
    pub error: ExtractionError,
}

/// Outcome of coordinating one job's extraction.
#[derive(Debug, Clone, Default)]
pub struct ExtractionReport {
    /// Extracted frames, ordered by sample index.
    pub results: Vec<ExtractionResult>,
    /// Skipped points, ordered by sample index.
    pub gaps: Vec<ExtractionGap>,
    /// Number of sample points in the job.
    pub total_points: usize,
    /// Wall-clock time spent extracting.
    pub elapsed: Duration,
}

impl ExtractionReport {
    /// Number of frames written.
    pub fn extracted(&self) -> usize {
        self.results.len()
    }

    /// Number of points skipped.
    pub fn skipped(&self) -> usize {
        self.gaps.len()
    }

    /// `true` when every sample point produced a frame.
    pub fn is_complete(&self) -> bool {
        self.gaps.is_empty()
    }

    /// Human-readable count, e.g. `"4 of 5 points extracted (1 skipped)"`.
    pub fn summary(&self) -> String {
        let mut text = format!("{} of {} points extracted", self.extracted(), self.total_points);
        if !self.is_complete() {
            text.push_str(&format!(" ({} skipped)", self.skipped()));
        }
        text
    }
}

#[derive(Serialize)]
struct ReportSummary<'a> {
    total_points: usize,
    extracted: usize,
    skipped: usize,
    elapsed_seconds: f64,
    results: &'a [ExtractionResult],
    skipped_labels: Vec<&'a str>,
}

impl Serialize for ExtractionReport {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        ReportSummary {
            total_points: self.total_points,
            extracted: self.extracted(),
            skipped: self.skipped(),
            elapsed_seconds: self.elapsed.as_secs_f64(),
            results: &self.results,
            skipped_labels: self.gaps.iter().map(|gap| gap.label.as_str()).collect(),
        }
        .serialize(serializer)
    }
}

/// Extract one point, turning a failure into a gap.
pub(crate) fn extract_point<D: VideoDecoder + ?Sized>(
    decoder: &mut D,
    extractor: &FrameExtractor,
    sample_index: usize,
    point: &SamplePoint,
) -> Result<ExtractionResult, ExtractionGap> {
    extractor
        .extract_to_file(decoder, sample_index, point)
        .map_err(|error| {
            let label = extractor.label(point);
            log::warn!("Skipping sample point {sample_index} ({label}): {error}");
            ExtractionGap {
                sample_index,
                label,
                error,
            }
        })
}

/// Drives extraction for one job.
///
/// # Example
///
/// ```no_run
/// use stillshot::{
///     DecoderOpener, ExtractionCoordinator, FfmpegOpener, FrameExtractor, SamplingOptions,
///     VideoDecoder, sample,
/// };
///
/// let options = SamplingOptions::new();
/// let decoder = FfmpegOpener.open("input.mp4".as_ref())?;
/// let points = sample(&decoder.stream_info(), 5.0, options.strategy())?;
/// let extractor = FrameExtractor::new(
///     "frames",
///     "file://input.mp4",
///     options.image_format(),
///     options.label_style(),
/// );
///
/// let report = ExtractionCoordinator::new(&FfmpegOpener, &options)
///     .run(decoder, "input.mp4".as_ref(), &extractor, &points)?;
/// println!("{}", report.summary());
/// # Ok::<(), stillshot::StillshotError>(())
/// ```
pub struct ExtractionCoordinator<'a, O: DecoderOpener> {
    opener: &'a O,
    options: &'a SamplingOptions,
}

impl<'a, O: DecoderOpener> ExtractionCoordinator<'a, O> {
    /// Coordinate with `opener` providing worker decoders.
    pub fn new(opener: &'a O, options: &'a SamplingOptions) -> Self {
        Self { opener, options }
    }

    /// Extract every point.
    ///
    /// `decoder` is the job's already-open handle. Serial mode uses it for
    /// every point; parallel mode drops it and opens one handle per worker
    /// against `video_path`.
    ///
    /// # Errors
    ///
    /// [`StillshotError::Cancelled`] if the token fires,
    /// [`StillshotError::Acquisition`] if a worker cannot open its decoder,
    /// [`StillshotError::WorkerPool`] if the pool cannot start.
    pub fn run(
        &self,
        mut decoder: O::Decoder,
        video_path: &Path,
        extractor: &FrameExtractor,
        points: &[SamplePoint],
    ) -> Result<ExtractionReport, StillshotError> {
        let start_time = Instant::now();
        log::info!(
            "Extracting {} sample points from {} ({:?})",
            points.len(),
            video_path.display(),
            self.options.execution_mode,
        );

        let outcomes = match self.options.execution_mode {
            ExecutionMode::Serial => self.run_serial(&mut decoder, extractor, points)?,
            ExecutionMode::Parallel => {
                drop(decoder);
                parallel::extract_parallel(self.opener, video_path, extractor, points, self.options)?
            }
        };

        let mut report = ExtractionReport {
            total_points: points.len(),
            ..ExtractionReport::default()
        };
        for outcome in outcomes {
            match outcome {
                Ok(result) => report.results.push(result),
                Err(gap) => report.gaps.push(gap),
            }
        }
        report.results.sort_by_key(|result| result.sample_index);
        report.gaps.sort_by_key(|gap| gap.sample_index);
        report.elapsed = start_time.elapsed();

        log::info!("{} in {:.2?}", report.summary(), report.elapsed);
        Ok(report)
    }

    fn run_serial(
        &self,
        decoder: &mut O::Decoder,
        extractor: &FrameExtractor,
        points: &[SamplePoint],
    ) -> Result<Vec<Result<ExtractionResult, ExtractionGap>>, StillshotError> {
        let reporter = ProgressReporter::new(self.options.progress.clone());
        let total = points.len();
        let mut outcomes = Vec::with_capacity(total);

        for (sample_index, point) in points.iter().enumerate() {
            if self.options.is_cancelled() {
                return Err(StillshotError::Cancelled);
            }
            outcomes.push(extract_point(decoder, extractor, sample_index, point));
            reporter.report(sample_index + 1, total);
        }

        Ok(outcomes)
    }
}
