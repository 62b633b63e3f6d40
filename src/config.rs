//! Job configuration.
//!
//! [`SamplingOptions`] is a builder that carries the sampling strategy,
//! execution mode, output format, progress observer, and cancellation token
//! through a job without widening every function signature.
//!
//! # Example
//!
//! ```no_run
//! use std::num::NonZeroUsize;
//! use std::sync::Arc;
//!
//! use stillshot::{
//!     CancellationToken, ExecutionMode, ImageFormat, LogProgress, SamplingOptions,
//!     SamplingStrategy,
//! };
//!
//! let token = CancellationToken::new();
//! let options = SamplingOptions::new()
//!     .with_strategy(SamplingStrategy::RandomSeek)
//!     .with_execution_mode(ExecutionMode::Parallel)
//!     .with_workers(NonZeroUsize::new(4).unwrap())
//!     .with_image_format(ImageFormat::Jpeg)
//!     .with_progress(Arc::new(LogProgress))
//!     .with_cancellation(token.clone());
//! ```

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::num::NonZeroUsize;
use std::str::FromStr;
use std::sync::Arc;

use crate::progress::{CancellationToken, NoOpProgress, ProgressObserver};
use crate::sampler::{LabelStyle, SamplingStrategy};

/// How the coordinator schedules extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    /// One decoder, points in order, one ordered progress event per point.
    #[default]
    Serial,
    /// A fixed-size worker pool, one decoder per worker. Progress is
    /// best-effort and unordered.
    Parallel,
}

/// Container format for written frames. Chosen from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageFormat {
    #[default]
    Png,
    Jpeg,
    Bmp,
    Tiff,
    WebP,
}

impl ImageFormat {
    /// File extension without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Bmp => "bmp",
            ImageFormat::Tiff => "tiff",
            ImageFormat::WebP => "webp",
        }
    }

    pub(crate) fn to_image_format(self) -> image::ImageFormat {
        match self {
            ImageFormat::Png => image::ImageFormat::Png,
            ImageFormat::Jpeg => image::ImageFormat::Jpeg,
            ImageFormat::Bmp => image::ImageFormat::Bmp,
            ImageFormat::Tiff => image::ImageFormat::Tiff,
            ImageFormat::WebP => image::ImageFormat::WebP,
        }
    }
}

impl FromStr for ImageFormat {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "png" => Ok(ImageFormat::Png),
            "jpg" | "jpeg" => Ok(ImageFormat::Jpeg),
            "bmp" => Ok(ImageFormat::Bmp),
            "tif" | "tiff" => Ok(ImageFormat::Tiff),
            "webp" => Ok(ImageFormat::WebP),
            other => Err(format!("unsupported image format: {other}")),
        }
    }
}

/// Settings for one sampling job.
///
/// A default-constructed value samples with sequential-scan, runs serially,
/// writes PNG, reports to nobody, and cannot be cancelled.
#[derive(Clone)]
pub struct SamplingOptions {
    pub(crate) strategy: SamplingStrategy,
    pub(crate) execution_mode: ExecutionMode,
    pub(crate) workers: Option<NonZeroUsize>,
    pub(crate) image_format: ImageFormat,
    pub(crate) label_style: Option<LabelStyle>,
    pub(crate) progress: Arc<dyn ProgressObserver>,
    pub(crate) cancellation: Option<CancellationToken>,
    pub(crate) require_samples: bool,
}

impl Debug for SamplingOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("SamplingOptions")
            .field("strategy", &self.strategy)
            .field("execution_mode", &self.execution_mode)
            .field("workers", &self.worker_count())
            .field("image_format", &self.image_format)
            .field("label_style", &self.label_style())
            .field("has_cancellation", &self.cancellation.is_some())
            .field("require_samples", &self.require_samples)
            .finish()
    }
}

impl Default for SamplingOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl SamplingOptions {
    /// Create options with default settings.
    pub fn new() -> Self {
        Self {
            strategy: SamplingStrategy::default(),
            execution_mode: ExecutionMode::default(),
            workers: None,
            image_format: ImageFormat::default(),
            label_style: None,
            progress: Arc::new(NoOpProgress),
            cancellation: None,
            require_samples: false,
        }
    }

    /// Choose how sample points are positioned.
    #[must_use]
    pub fn with_strategy(mut self, strategy: SamplingStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Choose serial or parallel extraction.
    #[must_use]
    pub fn with_execution_mode(mut self, mode: ExecutionMode) -> Self {
        self.execution_mode = mode;
        self
    }

    /// Fix the parallel worker pool size.
    ///
    /// Defaults to [`std::thread::available_parallelism`]. Ignored in serial
    /// mode.
    #[must_use]
    pub fn with_workers(mut self, workers: NonZeroUsize) -> Self {
        self.workers = Some(workers);
        self
    }

    /// Set the format frames are written in.
    #[must_use]
    pub fn with_image_format(mut self, format: ImageFormat) -> Self {
        self.image_format = format;
        self
    }

    /// Override the label style. Defaults to
    /// [`SamplingStrategy::default_label_style`].
    #[must_use]
    pub fn with_label_style(mut self, style: LabelStyle) -> Self {
        self.label_style = Some(style);
        self
    }

    /// Attach a progress observer for this job.
    #[must_use]
    pub fn with_progress(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.progress = observer;
        self
    }

    /// Attach a cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Fail with [`InvalidInterval`](crate::StillshotError::InvalidInterval)
    /// instead of succeeding trivially when no sample points are produced.
    #[must_use]
    pub fn with_require_samples(mut self, require: bool) -> Self {
        self.require_samples = require;
        self
    }

    /// The configured strategy.
    pub fn strategy(&self) -> SamplingStrategy {
        self.strategy
    }

    /// The configured execution mode.
    pub fn execution_mode(&self) -> ExecutionMode {
        self.execution_mode
    }

    /// The configured image format.
    pub fn image_format(&self) -> ImageFormat {
        self.image_format
    }

    /// Effective label style.
    pub fn label_style(&self) -> LabelStyle {
        self.label_style
            .unwrap_or_else(|| self.strategy.default_label_style())
    }

    /// Effective worker pool size.
    pub fn worker_count(&self) -> usize {
        self.workers
            .or_else(|| std::thread::available_parallelism().ok())
            .map_or(1, NonZeroUsize::get)
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }
}
