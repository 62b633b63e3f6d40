//! Stream metadata.
//!
//! [`StreamInfo`] is read once from an opened decoder and stays fixed for
//! the rest of the job. Everything the sampler needs to plan a job is in
//! here.

use std::time::Duration;

use serde::Serialize;

/// Timing metadata for the video stream being sampled.
///
/// # Example
///
/// ```
/// use stillshot::StreamInfo;
///
/// let info = StreamInfo::new(130.0, 30.0, 3900);
/// assert_eq!(info.duration().as_secs(), 130);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[must_use]
pub struct StreamInfo {
    /// Total duration in seconds.
    pub duration_seconds: f64,
    /// Frames per second (the stream's average rate for variable-rate content).
    pub frame_rate: f64,
    /// Total number of frames, as reported by the container or estimated
    /// from duration and frame rate.
    pub total_frames: u64,
}

impl StreamInfo {
    /// Build stream metadata from its three components.
    pub fn new(duration_seconds: f64, frame_rate: f64, total_frames: u64) -> Self {
        Self {
            duration_seconds,
            frame_rate,
            total_frames,
        }
    }

    /// Duration as a [`Duration`]. Negative or non-finite values clamp to zero.
    pub fn duration(&self) -> Duration {
        Duration::try_from_secs_f64(self.duration_seconds).unwrap_or(Duration::ZERO)
    }

    /// Seconds covered by one frame, or `None` when the frame rate is unknown.
    pub fn frame_period(&self) -> Option<f64> {
        (self.frame_rate > 0.0).then(|| 1.0 / self.frame_rate)
    }
}
