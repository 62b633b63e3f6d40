//! Video decoder interface and its FFmpeg implementation.
//!
//! A [`VideoDecoder`] is a stateful handle: position it, then read a frame.
//! Handles are never shared between threads. Parallel extraction asks a
//! [`DecoderOpener`] for one handle per worker instead.

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::path::{Path, PathBuf};

use ffmpeg_next::{
    Rational,
    codec::context::Context as CodecContext,
    decoder::Video as FfmpegVideoDecoder,
    format::{Pixel, context::Input},
    frame::Video as VideoFrame,
    media::Type,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
};
use image::{DynamicImage, RgbImage};

use crate::error::{ExtractionError, StillshotError};
use crate::metadata::StreamInfo;
use crate::utilities;

/// Where the next [`VideoDecoder::read_frame`] should start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderPosition {
    /// Zero-based frame index.
    Frame(u64),
    /// Milliseconds from the start of the stream.
    Milliseconds(u64),
}

/// An open, stateful connection to a decoded video stream.
///
/// Closing is handled by `Drop`.
pub trait VideoDecoder {
    /// Timing metadata of the stream.
    fn stream_info(&self) -> StreamInfo;

    /// Move the decode cursor.
    fn set_position(&mut self, position: DecoderPosition) -> Result<(), ExtractionError>;

    /// Decode the frame at the cursor. `Ok(None)` means the stream ended
    /// before a frame was found.
    fn read_frame(&mut self) -> Result<Option<DynamicImage>, ExtractionError>;
}

/// Opens decoder handles against a video file.
///
/// Shared by reference across worker threads, hence `Sync`. The handles it
/// produces need not be `Send`: each worker opens and drops its own.
pub trait DecoderOpener: Sync {
    /// The handle type produced.
    type Decoder: VideoDecoder;

    /// Open a fresh handle.
    ///
    /// # Errors
    ///
    /// [`StillshotError::Acquisition`] if the file cannot be opened or has no
    /// video stream.
    fn open(&self, path: &Path) -> Result<Self::Decoder, StillshotError>;
}

/// Opens [`FfmpegDecoder`] handles.
#[derive(Debug, Clone, Copy, Default)]
pub struct FfmpegOpener;

impl DecoderOpener for FfmpegOpener {
    type Decoder = FfmpegDecoder;

    fn open(&self, path: &Path) -> Result<FfmpegDecoder, StillshotError> {
        FfmpegDecoder::open(path)
    }
}

/// Frame-accurate decoder backed by FFmpeg.
///
/// Seeking lands on the keyframe at or before the target; the next
/// [`read_frame`](VideoDecoder::read_frame) decodes forward and returns the
/// first frame whose presentation time reaches the target.
pub struct FfmpegDecoder {
    input: Input,
    decoder: FfmpegVideoDecoder,
    scaler: ScalingContext,
    stream_index: usize,
    time_base: Rational,
    start_seconds: f64,
    width: u32,
    height: u32,
    stream_info: StreamInfo,
    target_seconds: f64,
    drained: bool,
    path: PathBuf,
}

impl Debug for FfmpegDecoder {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("FfmpegDecoder")
            .field("path", &self.path)
            .field("stream_index", &self.stream_index)
            .field("stream_info", &self.stream_info)
            .field("start_seconds", &self.start_seconds)
            .field("target_seconds", &self.target_seconds)
            .finish_non_exhaustive()
    }
}

impl FfmpegDecoder {
    /// Open `path` and prepare its best video stream for decoding.
    ///
    /// # Errors
    ///
    /// [`StillshotError::Acquisition`] when FFmpeg cannot open the file, finds
    /// no video stream, or cannot build a decoder for it.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StillshotError> {
        let path = path.as_ref().to_path_buf();
        let display = path.display().to_string();
        log::debug!("Opening video file: {display}");

        ffmpeg_next::init().map_err(|error| {
            StillshotError::acquisition(&display, format!("FFmpeg initialisation failed: {error}"))
        })?;

        let input = ffmpeg_next::format::input(&path)
            .map_err(|error| StillshotError::acquisition(&display, error))?;

        let (
            stream_index,
            time_base,
            start_pts,
            frame_rate,
            stream_frames,
            stream_duration,
            parameters,
        ) = {
            let stream = input
                .streams()
                .best(Type::Video)
                .ok_or_else(|| StillshotError::acquisition(&display, "no video stream found"))?;
            let frame_rate = utilities::rational_to_f64(stream.avg_frame_rate())
                .or_else(|| utilities::rational_to_f64(stream.rate()))
                .unwrap_or(0.0);
            (
                stream.index(),
                stream.time_base(),
                stream.start_time(),
                frame_rate,
                stream.frames(),
                stream.duration(),
                stream.parameters(),
            )
        };

        let decoder = CodecContext::from_parameters(parameters)
            .and_then(|context| context.decoder().video())
            .map_err(|error| {
                StillshotError::acquisition(&display, format!("cannot create decoder: {error}"))
            })?;

        let width = decoder.width();
        let height = decoder.height();
        let scaler = ScalingContext::get(
            decoder.format(),
            width,
            height,
            Pixel::RGB24,
            width,
            height,
            ScalingFlags::BILINEAR,
        )
        .map_err(|error| {
            StillshotError::acquisition(&display, format!("cannot create scaler: {error}"))
        })?;

        let duration_seconds = if input.duration() > 0 {
            utilities::seek_timestamp_to_seconds(input.duration())
        } else if stream_duration > 0 {
            utilities::pts_to_seconds(stream_duration, time_base)
        } else {
            0.0
        };

        // Unknown start times come back as AV_NOPTS_VALUE, which is negative.
        let start_seconds = if start_pts > 0 {
            utilities::pts_to_seconds(start_pts, time_base)
        } else {
            0.0
        };

        let total_frames = if stream_frames > 0 {
            stream_frames as u64
        } else {
            (duration_seconds * frame_rate) as u64
        };

        let stream_info = StreamInfo::new(duration_seconds, frame_rate, total_frames);
        log::debug!(
            "Stream {stream_index} of {display}: {:.3}s from {start_seconds:.3}s, \
             {:.3} fps, {} frames, {width}x{height}",
            stream_info.duration_seconds,
            stream_info.frame_rate,
            stream_info.total_frames,
        );

        Ok(Self {
            input,
            decoder,
            scaler,
            stream_index,
            time_base,
            start_seconds,
            width,
            height,
            stream_info,
            target_seconds: 0.0,
            drained: false,
            path,
        })
    }

    /// Whether a decoded frame sits at or past the requested position.
    ///
    /// Targets count from the start of the stream, PTS values from the
    /// container's clock. Half a frame period of slack absorbs PTS rounding.
    fn reached_target(&self, frame: &VideoFrame) -> bool {
        let Some(pts) = frame.timestamp().or_else(|| frame.pts()) else {
            return true;
        };
        let slack = self.stream_info.frame_period().map_or(0.001, |period| period / 2.0);
        utilities::pts_to_seconds(pts, self.time_base) - self.start_seconds + slack
            >= self.target_seconds
    }

    fn convert(&mut self, frame: &VideoFrame) -> Result<DynamicImage, ExtractionError> {
        let mut rgb_frame = VideoFrame::empty();
        self.scaler.run(frame, &mut rgb_frame)?;
        let buffer = utilities::frame_to_buffer(&rgb_frame, self.width, self.height, 3);
        let image = RgbImage::from_raw(self.width, self.height, buffer).ok_or_else(|| {
            ExtractionError::DecodeFailure(
                "decoded frame does not match the stream dimensions".to_string(),
            )
        })?;
        Ok(DynamicImage::ImageRgb8(image))
    }

    fn next_packet(&mut self) -> Option<ffmpeg_next::Packet> {
        let stream_index = self.stream_index;
        self.input
            .packets()
            .find(|(stream, _)| stream.index() == stream_index)
            .map(|(_, packet)| packet)
    }

    /// Pull every frame the decoder has buffered until one reaches the target.
    fn receive_target(&mut self) -> Result<Option<DynamicImage>, ExtractionError> {
        let mut decoded = VideoFrame::empty();
        while self.decoder.receive_frame(&mut decoded).is_ok() {
            if self.reached_target(&decoded) {
                return self.convert(&decoded).map(Some);
            }
        }
        Ok(None)
    }
}

impl VideoDecoder for FfmpegDecoder {
    fn stream_info(&self) -> StreamInfo {
        self.stream_info
    }

    fn set_position(&mut self, position: DecoderPosition) -> Result<(), ExtractionError> {
        let target_seconds = match position {
            DecoderPosition::Frame(number) => match self.stream_info.frame_period() {
                Some(period) => number as f64 * period,
                None => {
                    return Err(ExtractionError::DecodeFailure(
                        "cannot position by frame: unknown frame rate".to_string(),
                    ));
                }
            },
            DecoderPosition::Milliseconds(millis) => millis as f64 / 1000.0,
        };

        let timestamp = utilities::seconds_to_seek_timestamp(target_seconds + self.start_seconds);
        log::debug!("Seeking {} to {target_seconds:.3}s", self.path.display());
        self.input
            .seek(timestamp, ..timestamp)
            .map_err(|error| seek_failure(target_seconds, &self.stream_info, error))?;
        self.decoder.flush();
        self.target_seconds = target_seconds;
        self.drained = false;
        Ok(())
    }

    fn read_frame(&mut self) -> Result<Option<DynamicImage>, ExtractionError> {
        while !self.drained {
            if let Some(image) = self.receive_target()? {
                return Ok(Some(image));
            }
            match self.next_packet() {
                Some(packet) => self.decoder.send_packet(&packet)?,
                None => {
                    self.decoder.send_eof()?;
                    self.drained = true;
                }
            }
        }
        self.receive_target()
    }
}

/// Classify a rejected seek. Targets at or past the end of the stream are
/// [`ExtractionError::EndOfStream`]; anything else is a decode failure.
fn seek_failure(
    target_seconds: f64,
    stream_info: &StreamInfo,
    error: ffmpeg_next::Error,
) -> ExtractionError {
    if target_seconds >= stream_info.duration_seconds {
        log::debug!("Seek to {target_seconds:.3}s rejected past the end: {error}");
        ExtractionError::EndOfStream
    } else {
        ExtractionError::from(error)
    }
}

#[cfg(test)]
mod tests {
    use super::seek_failure;
    use crate::error::ExtractionError;
    use crate::metadata::StreamInfo;

    fn ten_seconds() -> StreamInfo {
        StreamInfo::new(10.0, 30.0, 300)
    }

    #[test]
    fn rejected_seek_past_the_end_is_end_of_stream() {
        let error = seek_failure(12.0, &ten_seconds(), ffmpeg_next::Error::InvalidData);
        assert_eq!(error, ExtractionError::EndOfStream);

        let error = seek_failure(10.0, &ten_seconds(), ffmpeg_next::Error::InvalidData);
        assert_eq!(error, ExtractionError::EndOfStream);
    }

    #[test]
    fn rejected_seek_inside_the_stream_is_a_decode_failure() {
        let error = seek_failure(4.0, &ten_seconds(), ffmpeg_next::Error::InvalidData);
        assert!(matches!(error, ExtractionError::DecodeFailure(_)), "{error:?}");
    }
}
