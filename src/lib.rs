//! # stillshot
//!
//! Sample still frames from a video at fixed time intervals.
//!
//! `stillshot` computes evenly spaced sample points from a stream's timing
//! metadata, extracts a frame-accurate image at each one (serially or across
//! a worker pool), reports progress to an observer, and finally zips the
//! frames or registers them with an asset catalog. Decoding is done by
//! FFmpeg via [`ffmpeg-next`](https://crates.io/crates/ffmpeg-next);
//! downloading by the `yt-dlp` executable.
//!
//! ## Quick Start
//!
//! ### Sample a local file
//!
//! ```no_run
//! use stillshot::{FfmpegOpener, SamplingOptions, extract_frames};
//!
//! let report = extract_frames(
//!     &FfmpegOpener,
//!     "talk.mp4".as_ref(),
//!     "file://talk.mp4",
//!     30.0,
//!     "frames".as_ref(),
//!     &SamplingOptions::new(),
//! )?;
//! println!("{}", report.summary());
//! # Ok::<(), stillshot::StillshotError>(())
//! ```
//!
//! ### Sample a URL into an archive, in parallel
//!
//! ```no_run
//! use stillshot::{
//!     ExecutionMode, FfmpegOpener, SamplingJob, SamplingOptions, SamplingStrategy,
//!     YtDlpDownloader,
//! };
//!
//! let options = SamplingOptions::new()
//!     .with_strategy(SamplingStrategy::RandomSeek)
//!     .with_execution_mode(ExecutionMode::Parallel);
//! let job = SamplingJob::new(YtDlpDownloader::new(), FfmpegOpener, "work")
//!     .with_options(options);
//!
//! let outcome = job.archive("https://www.youtube.com/watch?v=dQw4w9WgXcQ", 10.0)?;
//! println!("{} -> {:?}", outcome.report.summary(), outcome.archive);
//! # Ok::<(), stillshot::StillshotError>(())
//! ```
//!
//! ## Strategies
//!
//! | Strategy | Positions by | Default labels |
//! |----------|--------------|----------------|
//! | [`SamplingStrategy::SequentialScan`] | frame index | `00_01_30` |
//! | [`SamplingStrategy::RandomSeek`] | milliseconds | `000090_0` |
//!
//! ## Failure model
//!
//! A point that cannot be decoded or written is skipped and recorded as an
//! [`ExtractionGap`]; the job carries on. Only acquisition failures, invalid
//! intervals, packaging failures, and cancellation end a job. See
//! [`FailureKind`].
//!
//! ### Optional Features
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `async` | `WatchProgress`, a Tokio `watch` channel progress observer |
//! | `catalog` | `EagleCatalog`, registration with the Eagle asset manager |
//! | `full` | Enables all of the above |
//!
//! ## Requirements
//!
//! FFmpeg development libraries must be installed to build, and `yt-dlp`
//! must be on `PATH` to download.

pub mod catalog;
pub mod config;
pub mod coordinator;
pub mod decoder;
pub mod downloader;
pub mod error;
pub mod extractor;
pub mod ffmpeg;
pub mod job;
pub mod metadata;
pub mod packager;
mod parallel;
pub mod progress;
pub mod sampler;
mod utilities;

pub use catalog::AssetCatalog;
#[cfg(feature = "catalog")]
pub use catalog::{DEFAULT_EAGLE_URL, EagleCatalog};
pub use config::{ExecutionMode, ImageFormat, SamplingOptions};
pub use coordinator::{ExtractionCoordinator, ExtractionGap, ExtractionReport};
pub use decoder::{DecoderOpener, DecoderPosition, FfmpegDecoder, FfmpegOpener, VideoDecoder};
pub use downloader::{DownloadedMedia, MediaDownloader, MediaInfo, YtDlpDownloader};
pub use error::{ExtractionError, FailureKind, StillshotError};
pub use extractor::{ExtractionResult, FrameExtractor};
pub use ffmpeg::{FfmpegLogLevel, set_ffmpeg_log_level};
pub use job::{JobOutcome, SamplingJob, extract_frames};
pub use metadata::StreamInfo;
pub use packager::{pack, register};
#[cfg(feature = "async")]
pub use progress::WatchProgress;
pub use progress::{
    CancellationToken, LogProgress, NoOpProgress, PROGRESS_EVENT_NAME, ProgressEvent,
    ProgressObserver, ProgressReporter, PushChannel, PushChannelProgress,
};
pub use sampler::{LabelStyle, SamplePoint, SamplingStrategy, sample};
