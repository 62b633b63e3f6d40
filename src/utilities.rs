//! Internal helpers shared by the FFmpeg decoder.
//!
//! Pixel-plane copying and conversions between seconds, stream time bases,
//! and FFmpeg's container-level seek unit.

use ffmpeg_next::{Rational, frame::Video as VideoFrame};

/// FFmpeg's `AV_TIME_BASE`: container seeks are expressed in microseconds.
const SEEK_UNITS_PER_SECOND: f64 = 1_000_000.0;

/// Copy pixel data from an FFmpeg video frame into a tightly-packed buffer.
///
/// FFmpeg rows often carry padding past `width * bytes_per_pixel`; the
/// padding is dropped so the result can go straight into
/// [`image::RgbImage::from_raw`].
pub(crate) fn frame_to_buffer(
    video_frame: &VideoFrame,
    width: u32,
    height: u32,
    bytes_per_pixel: usize,
) -> Vec<u8> {
    let stride = video_frame.stride(0);
    let row_length = (width as usize) * bytes_per_pixel;
    let data = video_frame.data(0);

    if stride == row_length {
        data[..row_length * (height as usize)].to_vec()
    } else {
        data.chunks(stride)
            .take(height as usize)
            .flat_map(|row| &row[..row_length])
            .copied()
            .collect()
    }
}

/// Convert seconds to the timestamp `Input::seek` expects.
pub(crate) fn seconds_to_seek_timestamp(seconds: f64) -> i64 {
    (seconds.max(0.0) * SEEK_UNITS_PER_SECOND) as i64
}

/// Convert a container duration (microseconds) to seconds.
pub(crate) fn seek_timestamp_to_seconds(timestamp: i64) -> f64 {
    timestamp as f64 / SEEK_UNITS_PER_SECOND
}

/// Rescale a PTS value from the stream time base to seconds.
pub(crate) fn pts_to_seconds(pts: i64, time_base: Rational) -> f64 {
    pts as f64 * time_base.numerator() as f64 / time_base.denominator() as f64
}

/// Evaluate a rational, treating a zero numerator or denominator as unknown.
pub(crate) fn rational_to_f64(rational: Rational) -> Option<f64> {
    (rational.numerator() != 0 && rational.denominator() != 0)
        .then(|| rational.numerator() as f64 / rational.denominator() as f64)
}
