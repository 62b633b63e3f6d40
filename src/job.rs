//! End-to-end sampling jobs.
//!
//! [`extract_frames`] runs the core pipeline against a local file: open,
//! sample, extract. [`SamplingJob`] adds acquisition in front and an output
//! step behind it: either a zip archive ([`SamplingJob::archive`]) or an
//! asset catalog folder ([`SamplingJob::catalog`]).
//!
//! Working directory layout for a video with id `abc`:
//!
//! ```text
//! <work_dir>/downloads/abc.mp4    downloaded source
//! <work_dir>/abc/00_00_00.png     extracted frames
//! <work_dir>/abc.zip              archive
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::catalog::AssetCatalog;
use crate::config::SamplingOptions;
use crate::coordinator::{ExtractionCoordinator, ExtractionReport};
use crate::decoder::{DecoderOpener, VideoDecoder};
use crate::downloader::{DownloadedMedia, MediaDownloader};
use crate::error::StillshotError;
use crate::extractor::FrameExtractor;
use crate::metadata::StreamInfo;
use crate::packager;
use crate::sampler;

/// Name of the download subdirectory inside the working directory.
const DOWNLOADS_DIR: &str = "downloads";

/// Sample frames from a local video file into `output_dir`.
///
/// The decoder is opened before anything else, so an unreadable file fails
/// before any progress is reported. `output_dir` is created if missing.
///
/// # Errors
///
/// - [`StillshotError::Acquisition`] if the video cannot be opened.
/// - [`StillshotError::InvalidInterval`] if `spacing_seconds` is shorter
///   than the strategy can resolve, or yields no points while
///   [`with_require_samples`](SamplingOptions::with_require_samples) is set.
/// - [`StillshotError::Packaging`] if `output_dir` cannot be created.
/// - [`StillshotError::Cancelled`] if the job's token fires.
///
/// # Example
///
/// ```no_run
/// use stillshot::{FfmpegOpener, SamplingOptions, extract_frames};
///
/// let report = extract_frames(
///     &FfmpegOpener,
///     "talk.mp4".as_ref(),
///     "https://example.com/talk",
///     30.0,
///     "frames".as_ref(),
///     &SamplingOptions::new(),
/// )?;
/// println!("{}", report.summary());
/// # Ok::<(), stillshot::StillshotError>(())
/// ```
pub fn extract_frames<O: DecoderOpener>(
    opener: &O,
    video_path: &Path,
    source_url: &str,
    spacing_seconds: f64,
    output_dir: &Path,
    options: &SamplingOptions,
) -> Result<ExtractionReport, StillshotError> {
    run_extraction(opener, video_path, source_url, spacing_seconds, output_dir, options)
        .map(|(_, report)| report)
}

fn run_extraction<O: DecoderOpener>(
    opener: &O,
    video_path: &Path,
    source_url: &str,
    spacing_seconds: f64,
    output_dir: &Path,
    options: &SamplingOptions,
) -> Result<(StreamInfo, ExtractionReport), StillshotError> {
    let decoder = opener.open(video_path)?;
    let stream_info = decoder.stream_info();

    let points = sampler::sample(&stream_info, spacing_seconds, options.strategy())?;
    if points.is_empty() {
        if options.require_samples {
            return Err(StillshotError::InvalidInterval {
                spacing_seconds,
                reason: format!(
                    "no sample points fit in a {:.3}s stream",
                    stream_info.duration_seconds
                ),
            });
        }
        log::info!(
            "Spacing of {spacing_seconds}s produces no sample points for {}",
            video_path.display()
        );
        return Ok((stream_info, ExtractionReport::default()));
    }

    fs::create_dir_all(output_dir)
        .map_err(|error| StillshotError::packaging(output_dir, error))?;

    let extractor = FrameExtractor::new(
        output_dir,
        source_url,
        options.image_format(),
        options.label_style(),
    );
    let report = ExtractionCoordinator::new(opener, options).run(
        decoder,
        video_path,
        &extractor,
        &points,
    )?;
    Ok((stream_info, report))
}

/// Everything one job produced.
#[derive(Debug, Clone, Serialize)]
pub struct JobOutcome {
    /// The downloaded source video.
    pub media: DownloadedMedia,
    /// Timing metadata of the source.
    pub stream_info: StreamInfo,
    /// Directory the frames were written to.
    pub output_dir: PathBuf,
    /// Extraction results and skipped points.
    pub report: ExtractionReport,
    /// Archive path, when the job was packed.
    pub archive: Option<PathBuf>,
    /// Catalog folder id, when the job was registered.
    pub catalog_folder: Option<String>,
}

/// URL-to-output pipeline.
///
/// ```no_run
/// use stillshot::{FfmpegOpener, SamplingJob, SamplingOptions, YtDlpDownloader};
///
/// let job = SamplingJob::new(YtDlpDownloader::new(), FfmpegOpener, "work");
/// let outcome = job.archive("https://www.youtube.com/watch?v=dQw4w9WgXcQ", 30.0)?;
/// println!("{:?}", outcome.archive);
/// # Ok::<(), stillshot::StillshotError>(())
/// ```
#[derive(Debug)]
pub struct SamplingJob<D, O> {
    downloader: D,
    opener: O,
    options: SamplingOptions,
    work_dir: PathBuf,
}

impl<D: MediaDownloader, O: DecoderOpener> SamplingJob<D, O> {
    /// Create a job with default [`SamplingOptions`].
    pub fn new(downloader: D, opener: O, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            downloader,
            opener,
            options: SamplingOptions::new(),
            work_dir: work_dir.into(),
        }
    }

    /// Replace the sampling options.
    #[must_use]
    pub fn with_options(mut self, options: SamplingOptions) -> Self {
        self.options = options;
        self
    }

    /// The job's options.
    pub fn options(&self) -> &SamplingOptions {
        &self.options
    }

    /// The working directory.
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Download `url` and sample it. No output step.
    ///
    /// The job owns `<work_dir>/<id>/`: frames left there by an earlier run
    /// are removed before extraction, so the folder holds exactly this
    /// run's output.
    ///
    /// # Errors
    ///
    /// As [`extract_frames`], plus [`StillshotError::Acquisition`] if the
    /// download fails and [`StillshotError::Packaging`] if stale output
    /// cannot be removed.
    pub fn extract(&self, url: &str, spacing_seconds: f64) -> Result<JobOutcome, StillshotError> {
        log::info!("Sampling {url} every {spacing_seconds}s");
        let media = self
            .downloader
            .fetch(url, &self.work_dir.join(DOWNLOADS_DIR))?;
        let output_dir = self.work_dir.join(&media.info.id);
        clear_previous_output(&output_dir)?;

        let (stream_info, report) = run_extraction(
            &self.opener,
            &media.path,
            url,
            spacing_seconds,
            &output_dir,
            &self.options,
        )?;

        Ok(JobOutcome {
            media,
            stream_info,
            output_dir,
            report,
            archive: None,
            catalog_folder: None,
        })
    }

    /// Sample `url` and zip the frames.
    ///
    /// A job with no sample points still produces an archive holding the
    /// empty output folder.
    ///
    /// # Errors
    ///
    /// As [`extract`](Self::extract), plus [`StillshotError::Packaging`] if
    /// the archive cannot be written. Frames stay on disk in that case.
    pub fn archive(&self, url: &str, spacing_seconds: f64) -> Result<JobOutcome, StillshotError> {
        let mut outcome = self.extract(url, spacing_seconds)?;
        fs::create_dir_all(&outcome.output_dir)
            .map_err(|error| StillshotError::packaging(&outcome.output_dir, error))?;
        outcome.archive = Some(packager::pack(&outcome.output_dir)?);
        Ok(outcome)
    }

    /// Sample `url` and register the frames in a new catalog folder named
    /// after the video's title. The source video is added first.
    ///
    /// # Errors
    ///
    /// As [`extract`](Self::extract), plus whatever the catalog returns.
    pub fn catalog<C: AssetCatalog + ?Sized>(
        &self,
        url: &str,
        spacing_seconds: f64,
        catalog: &C,
    ) -> Result<JobOutcome, StillshotError> {
        let mut outcome = self.extract(url, spacing_seconds)?;
        let info = &outcome.media.info;
        let folder_name = if info.title.trim().is_empty() {
            info.id.as_str()
        } else {
            info.title.as_str()
        };

        let folder_id = catalog.create_folder(folder_name)?;
        log::debug!("Created catalog folder {folder_id} ({folder_name})");
        catalog.add_item(&outcome.media.path, folder_name, url, &folder_id)?;
        packager::register(catalog, &outcome.report.results, &folder_id)?;

        outcome.catalog_folder = Some(folder_id);
        Ok(outcome)
    }
}

fn clear_previous_output(output_dir: &Path) -> Result<(), StillshotError> {
    if !output_dir.exists() {
        return Ok(());
    }
    log::debug!("Removing previous output in {}", output_dir.display());
    fs::remove_dir_all(output_dir).map_err(|error| StillshotError::packaging(output_dir, error))
}
