//! Progress reporting and cancellation.
//!
//! Observers are handed to each job through
//! [`SamplingOptions::with_progress`](crate::SamplingOptions::with_progress);
//! nothing is registered process-wide. The coordinator drives a
//! [`ProgressReporter`], which turns `(completed, total)` pairs into
//! [`ProgressEvent`]s for the observer.
//!
//! # Ordering
//!
//! In serial mode the observer sees exactly one event per sample point,
//! in order. In parallel mode every worker reports on its own, so events
//! may arrive out of order and `completed` may go backwards between two
//! consecutive events. Only the latest event with the highest `completed`
//! value is meaningful. Forcing order would serialize the workers.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use stillshot::{ProgressEvent, ProgressObserver, SamplingOptions};
//!
//! struct PrintProgress;
//!
//! impl ProgressObserver for PrintProgress {
//!     fn on_progress(&self, event: &ProgressEvent) {
//!         println!("{:.1}% ({}/{})", event.percent, event.completed, event.total);
//!     }
//! }
//!
//! let options = SamplingOptions::new().with_progress(Arc::new(PrintProgress));
//! ```

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use serde::Serialize;
use serde_json::{Value, json};

/// Name of the event [`PushChannelProgress`] emits.
pub const PROGRESS_EVENT_NAME: &str = "progress_update";

/// One completion snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProgressEvent {
    /// Sample points processed so far, successful or not.
    pub completed: usize,
    /// Sample points in the job.
    pub total: usize,
    /// `completed / total * 100`.
    pub percent: f64,
}

impl ProgressEvent {
    /// Build an event. An empty job counts as fully complete.
    pub fn new(completed: usize, total: usize) -> Self {
        let percent = if total == 0 {
            100.0
        } else {
            completed as f64 / total as f64 * 100.0
        };
        Self {
            completed,
            total,
            percent,
        }
    }
}

/// Receives progress events during extraction.
///
/// Must be [`Send`] and [`Sync`]: in parallel mode it is called from
/// worker threads. Observers cannot stop a job; use
/// [`CancellationToken`] for that.
pub trait ProgressObserver: Send + Sync {
    /// Called once per processed sample point.
    fn on_progress(&self, event: &ProgressEvent);
}

/// Discards every event. The default observer.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpProgress;

impl ProgressObserver for NoOpProgress {
    fn on_progress(&self, _event: &ProgressEvent) {}
}

/// Writes each event as an `info` log line.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogProgress;

impl ProgressObserver for LogProgress {
    fn on_progress(&self, event: &ProgressEvent) {
        log::info!(
            "Extracted {}/{} sample points ({:.1}%)",
            event.completed,
            event.total,
            event.percent
        );
    }
}

/// A bidirectional push connection to a live client, such as a websocket
/// session.
pub trait PushChannel: Send + Sync {
    /// Send a named event with a JSON payload.
    fn emit(&self, event_name: &str, payload: Value);
}

/// Forwards progress to a [`PushChannel`] as [`PROGRESS_EVENT_NAME`]
/// events carrying `{"progress", "completed", "total"}`.
#[derive(Debug, Clone)]
pub struct PushChannelProgress<C> {
    channel: C,
}

impl<C: PushChannel> PushChannelProgress<C> {
    /// Wrap a channel.
    pub fn new(channel: C) -> Self {
        Self { channel }
    }
}

impl<C: PushChannel> ProgressObserver for PushChannelProgress<C> {
    fn on_progress(&self, event: &ProgressEvent) {
        self.channel.emit(
            PROGRESS_EVENT_NAME,
            json!({
                "progress": event.percent,
                "completed": event.completed,
                "total": event.total,
            }),
        );
    }
}

/// Publishes into a [`tokio::sync::watch`] channel, which keeps only the
/// most recent event.
#[cfg(feature = "async")]
#[derive(Debug)]
pub struct WatchProgress {
    sender: tokio::sync::watch::Sender<Option<ProgressEvent>>,
}

#[cfg(feature = "async")]
impl WatchProgress {
    /// Create the observer and a receiver for it. The receiver starts at `None`.
    pub fn channel() -> (Self, tokio::sync::watch::Receiver<Option<ProgressEvent>>) {
        let (sender, receiver) = tokio::sync::watch::channel(None);
        (Self { sender }, receiver)
    }
}

#[cfg(feature = "async")]
impl ProgressObserver for WatchProgress {
    fn on_progress(&self, event: &ProgressEvent) {
        // Keep the furthest event; parallel workers may report out of order.
        self.sender.send_if_modified(|latest| match latest {
            Some(current) if current.completed >= event.completed => false,
            _ => {
                *latest = Some(*event);
                true
            }
        });
    }
}

/// Builds events and forwards them to the job's observer.
#[derive(Clone)]
pub struct ProgressReporter {
    observer: Arc<dyn ProgressObserver>,
}

impl ProgressReporter {
    /// Report to `observer`.
    pub fn new(observer: Arc<dyn ProgressObserver>) -> Self {
        Self { observer }
    }

    /// Emit one event for `completed` of `total` points.
    pub fn report(&self, completed: usize, total: usize) {
        self.observer.on_progress(&ProgressEvent::new(completed, total));
    }
}

/// Cooperative cancellation token backed by an [`AtomicBool`].
///
/// Clones share state. The coordinator checks the token before every
/// extraction and stops with
/// [`StillshotError::Cancelled`](crate::StillshotError::Cancelled).
///
/// ```
/// use stillshot::CancellationToken;
///
/// let token = CancellationToken::new();
/// let handle = token.clone();
/// handle.cancel();
/// assert!(token.is_cancelled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}
