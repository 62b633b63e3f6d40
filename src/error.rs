//! Error types for the `stillshot` crate.
//!
//! Two layers of failure exist. [`StillshotError`] is fatal to a job (or to
//! its final packaging step) and is what every public entry point returns.
//! [`ExtractionError`] describes a single sample point that could not be
//! captured; the coordinator absorbs it, records a gap, and keeps going.

use std::path::PathBuf;

use ffmpeg_next::Error as FfmpegError;
use thiserror::Error;

/// Coarse classification of a job-level failure.
///
/// Callers that only need to tell the user *what kind* of thing went wrong
/// can match on this instead of the individual error variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// The source video could not be downloaded or opened.
    Acquisition,
    /// The requested spacing is incompatible with the stream.
    InvalidInterval,
    /// A sample point failed to extract. Only seen on [`ExtractionError`];
    /// a job never fails with this kind.
    Extraction,
    /// Writing the archive or populating the catalog failed.
    Packaging,
    /// The job was cancelled through a [`CancellationToken`](crate::CancellationToken).
    Cancelled,
}

/// The unified job-level error type.
///
/// Every public method that can fail returns `Result<T, StillshotError>`.
/// Per-point failures never surface here; see [`ExtractionError`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StillshotError {
    /// The downloader or the decoder could not produce a usable video.
    #[error("Failed to acquire video from {input}: {reason}")]
    Acquisition {
        /// URL or local path that was being acquired.
        input: String,
        /// Underlying reason.
        reason: String,
    },

    /// The spacing cannot be turned into sample points for this stream.
    #[error("Invalid interval of {spacing_seconds}s: {reason}")]
    InvalidInterval {
        /// The spacing that was requested, in seconds.
        spacing_seconds: f64,
        /// Why it was rejected.
        reason: String,
    },

    /// The archive could not be written.
    #[error("Failed to package {path}: {reason}")]
    Packaging {
        /// Directory or archive path involved.
        path: PathBuf,
        /// Underlying reason.
        reason: String,
    },

    /// The asset catalog rejected a request or was unreachable.
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// The worker pool for parallel extraction could not be started.
    #[error("Failed to start worker pool: {0}")]
    WorkerPool(String),

    /// The job was cancelled between two extractions.
    #[error("Operation cancelled")]
    Cancelled,
}

impl StillshotError {
    /// Classify this error.
    pub fn kind(&self) -> FailureKind {
        match self {
            StillshotError::Acquisition { .. } | StillshotError::WorkerPool(_) => {
                FailureKind::Acquisition
            }
            StillshotError::InvalidInterval { .. } => FailureKind::InvalidInterval,
            StillshotError::Packaging { .. } | StillshotError::Catalog(_) => {
                FailureKind::Packaging
            }
            StillshotError::Cancelled => FailureKind::Cancelled,
        }
    }

    pub(crate) fn acquisition(input: impl Into<String>, reason: impl ToString) -> Self {
        StillshotError::Acquisition {
            input: input.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn packaging(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        StillshotError::Packaging {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// Failure to capture one sample point.
///
/// Recovered locally: the point is skipped and reported as a gap in the
/// [`ExtractionReport`](crate::ExtractionReport).
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum ExtractionError {
    /// The decoder had no frame at or after the requested position.
    #[error("End of stream reached before the requested position")]
    EndOfStream,

    /// The decoder failed while seeking or decoding.
    #[error("Failed to decode frame: {0}")]
    DecodeFailure(String),

    /// The decoded image could not be written to disk.
    #[error("Failed to write {path}: {reason}")]
    WriteFailure {
        /// Destination path.
        path: PathBuf,
        /// Underlying reason.
        reason: String,
    },
}

impl ExtractionError {
    /// Always [`FailureKind::Extraction`].
    pub fn kind(&self) -> FailureKind {
        FailureKind::Extraction
    }
}

impl From<FfmpegError> for ExtractionError {
    fn from(error: FfmpegError) -> Self {
        match error {
            FfmpegError::Eof => ExtractionError::EndOfStream,
            other => ExtractionError::DecodeFailure(other.to_string()),
        }
    }
}
