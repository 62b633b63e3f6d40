//! Parallel frame extraction.
//!
//! The sample points are split into one contiguous partition per worker
//! of a dedicated [`rayon`] pool. Each worker opens its own decoder, since
//! handles cannot seek and read concurrently, and walks its partition in
//! order. Workers write to distinct files (labels are unique), so nothing
//! is locked.
//!
//! Progress is reported per point from whichever worker finishes it,
//! through a shared counter. Events therefore arrive unordered.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::ThreadPoolBuilder;
use rayon::iter::{IntoParallelIterator, ParallelIterator};

use crate::config::SamplingOptions;
use crate::coordinator::{ExtractionGap, extract_point};
use crate::decoder::DecoderOpener;
use crate::error::StillshotError;
use crate::extractor::{ExtractionResult, FrameExtractor};
use crate::progress::ProgressReporter;
use crate::sampler::SamplePoint;

type PointOutcome = Result<ExtractionResult, ExtractionGap>;

/// Extract `points` across `options.worker_count()` workers.
///
/// Outcomes come back grouped by partition, i.e. in sample order; the
/// caller still sorts by sample index.
pub(crate) fn extract_parallel<O: DecoderOpener>(
    opener: &O,
    video_path: &Path,
    extractor: &FrameExtractor,
    points: &[SamplePoint],
    options: &SamplingOptions,
) -> Result<Vec<PointOutcome>, StillshotError> {
    if points.is_empty() {
        return Ok(Vec::new());
    }

    let workers = options.worker_count().min(points.len());
    let pool = ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|index| format!("stillshot-worker-{index}"))
        .build()
        .map_err(|error| StillshotError::WorkerPool(error.to_string()))?;

    let partitions = partition(points.len(), workers);
    log::debug!("Split {} points into {} partitions", points.len(), partitions.len());

    let reporter = ProgressReporter::new(options.progress.clone());
    let completed = AtomicUsize::new(0);
    let total = points.len();

    let results: Result<Vec<Vec<PointOutcome>>, StillshotError> = pool.install(|| {
        partitions
            .into_par_iter()
            .map(|(start, end)| {
                let mut decoder = opener.open(video_path)?;
                let mut outcomes = Vec::with_capacity(end - start);
                for (sample_index, point) in (start..end).zip(&points[start..end]) {
                    if options.is_cancelled() {
                        return Err(StillshotError::Cancelled);
                    }
                    outcomes.push(extract_point(&mut decoder, extractor, sample_index, point));
                    let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                    reporter.report(done, total);
                }
                Ok(outcomes)
            })
            .collect()
    });

    Ok(results?.into_iter().flatten().collect())
}

/// Split `len` items into at most `workers` contiguous, near-equal
/// `(start, end)` ranges.
fn partition(len: usize, workers: usize) -> Vec<(usize, usize)> {
    let workers = workers.clamp(1, len.max(1));
    let base = len / workers;
    let remainder = len % workers;

    let mut ranges = Vec::with_capacity(workers);
    let mut start = 0;
    for worker in 0..workers {
        let size = base + usize::from(worker < remainder);
        if size == 0 {
            continue;
        }
        ranges.push((start, start + size));
        start += size;
    }
    ranges
}
