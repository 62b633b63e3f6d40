//! Interval sampling.
//!
//! [`sample`] turns a [`StreamInfo`] and a spacing in seconds into the
//! ordered list of [`SamplePoint`]s a job will capture. Two strategies are
//! supported and may disagree by one point near the end of the stream:
//!
//! - [`SamplingStrategy::SequentialScan`] works in frame indices:
//!   `step = floor(frame_rate * spacing)` and `floor(total_frames / step)`
//!   points.
//! - [`SamplingStrategy::RandomSeek`] works in seconds: every
//!   `i * spacing` strictly below the duration.
//!
//! # Example
//!
//! ```
//! use stillshot::{LabelStyle, SamplingStrategy, StreamInfo, sample};
//!
//! let info = StreamInfo::new(130.0, 30.0, 3900);
//! let points = sample(&info, 30.0, SamplingStrategy::RandomSeek)?;
//! let labels: Vec<String> = points.iter().map(|p| p.label(LabelStyle::Clock)).collect();
//! assert_eq!(labels, ["00_00_00", "00_00_30", "00_01_00", "00_01_30", "00_02_00"]);
//! # Ok::<(), stillshot::StillshotError>(())
//! ```

use crate::error::StillshotError;
use crate::metadata::StreamInfo;

/// Smallest spacing either strategy accepts. Random-seek positions in whole
/// milliseconds and labels resolve to milliseconds, so closer points would
/// collide.
const MIN_SPACING_SECONDS: f64 = 0.001;

/// How sample points are positioned in the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SamplingStrategy {
    /// Position by frame index.
    #[default]
    SequentialScan,
    /// Position by timestamp, in milliseconds.
    RandomSeek,
}

impl SamplingStrategy {
    /// The label style used when none is configured explicitly.
    pub fn default_label_style(self) -> LabelStyle {
        match self {
            SamplingStrategy::SequentialScan => LabelStyle::Clock,
            SamplingStrategy::RandomSeek => LabelStyle::DecimalSeconds,
        }
    }
}

/// How a sample point's time is rendered into a file label.
///
/// Both styles sort lexically in capture order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelStyle {
    /// `HH_MM_SS`, with `_mmm` appended for fractional times.
    Clock,
    /// Whole seconds padded to six digits, then the fractional digits:
    /// `000012_5`.
    DecimalSeconds,
}

/// A single instant selected for extraction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SamplePoint {
    /// A frame index, with the nominal capture time used for labelling.
    Frame {
        /// Zero-based frame index.
        number: u64,
        /// `i * spacing` for the `i`-th point.
        seconds: f64,
    },
    /// A timestamp in seconds.
    Timestamp {
        /// Seconds from the start of the stream.
        seconds: f64,
    },
}

impl SamplePoint {
    /// The point's time value in seconds.
    pub fn seconds(&self) -> f64 {
        match *self {
            SamplePoint::Frame { seconds, .. } | SamplePoint::Timestamp { seconds } => seconds,
        }
    }

    /// Render the deterministic file label for this point.
    pub fn label(&self, style: LabelStyle) -> String {
        let total_millis = (self.seconds().max(0.0) * 1000.0).round() as u64;
        match style {
            LabelStyle::Clock => {
                let hours = total_millis / 3_600_000;
                let minutes = (total_millis % 3_600_000) / 60_000;
                let seconds = (total_millis % 60_000) / 1000;
                let millis = total_millis % 1000;
                if millis == 0 {
                    format!("{hours:02}_{minutes:02}_{seconds:02}")
                } else {
                    format!("{hours:02}_{minutes:02}_{seconds:02}_{millis:03}")
                }
            }
            LabelStyle::DecimalSeconds => {
                let whole = total_millis / 1000;
                let fraction = format!("{:03}", total_millis % 1000);
                let fraction = fraction.trim_end_matches('0');
                let fraction = if fraction.is_empty() { "0" } else { fraction };
                format!("{whole:06}_{fraction}")
            }
        }
    }
}

/// Compute the ordered sample points for a stream.
///
/// Returns an empty list (not an error) when `spacing_seconds` is not
/// positive or is at least the stream duration.
///
/// # Errors
///
/// [`StillshotError::InvalidInterval`] when the spacing is below one
/// millisecond, or shorter than one frame (sequential-scan).
pub fn sample(
    stream_info: &StreamInfo,
    spacing_seconds: f64,
    strategy: SamplingStrategy,
) -> Result<Vec<SamplePoint>, StillshotError> {
    let duration = stream_info.duration_seconds;
    if !(spacing_seconds > 0.0) || spacing_seconds >= duration {
        return Ok(Vec::new());
    }
    if spacing_seconds < MIN_SPACING_SECONDS {
        return Err(StillshotError::InvalidInterval {
            spacing_seconds,
            reason: "below the millisecond label resolution".to_string(),
        });
    }

    match strategy {
        SamplingStrategy::SequentialScan => {
            let frame_step = (stream_info.frame_rate * spacing_seconds).floor();
            if !(frame_step >= 1.0) {
                return Err(StillshotError::InvalidInterval {
                    spacing_seconds,
                    reason: format!(
                        "shorter than one frame at {:.3} fps",
                        stream_info.frame_rate
                    ),
                });
            }
            let frame_step = frame_step as u64;
            let count = stream_info.total_frames / frame_step;
            Ok((0..count)
                .map(|index| SamplePoint::Frame {
                    number: index * frame_step,
                    seconds: index as f64 * spacing_seconds,
                })
                .collect())
        }
        SamplingStrategy::RandomSeek => {
            // One extra candidate absorbs rounding in the division; the
            // half-open bound below trims it.
            let candidates = (duration / spacing_seconds).floor() as u64 + 1;
            Ok((0..candidates)
                .map(|index| index as f64 * spacing_seconds)
                .take_while(|&seconds| seconds < duration)
                .map(|seconds| SamplePoint::Timestamp { seconds })
                .collect())
        }
    }
}
