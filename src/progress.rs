//! Progress reporting and cancellation for index updates.

use std::sync::atomic::{AtomicBool, AtomicI16, Ordering};
use std::sync::mpsc::{Receiver, SyncSender, TryRecvError};
use std::sync::Arc;

use crate::error::SearchError;
use crate::manager::UpdateReport;

/// Receives progress from an index update. Implementations must be cheap:
/// they are called from the indexing thread between files.
pub trait ProgressReporter: Send + Sync {
    /// Completion in percent, 0..=100.
    fn progress(&self, percent: u8);
    /// Human-readable status line.
    fn message(&self, msg: &str);
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullReporter;

impl ProgressReporter for NullReporter {
    fn progress(&self, _percent: u8) {}
    fn message(&self, _msg: &str) {}
}

/// `round(done / total * 100)`, and 100 for an empty batch.
pub fn percent_done(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    let pct = (done as f64 / total as f64 * 100.0).round();
    pct.clamp(0.0, 100.0) as u8
}

/// One notification from an indexing run, in emission order.
#[derive(Debug)]
pub enum ProgressEvent {
    Percent(u8),
    Message(String),
    /// Final event of a run.
    Finished(Result<UpdateReport, SearchError>),
}

/// Forwards progress over a bounded channel.
///
/// Percentages never go backwards within one reporter. Sends block while the
/// channel is full, so the consumer sees every event in order; a dropped
/// receiver is ignored and the run continues.
#[derive(Debug)]
pub struct ChannelReporter {
    tx: SyncSender<ProgressEvent>,
    last_percent: AtomicI16,
}

impl ChannelReporter {
    pub fn new(tx: SyncSender<ProgressEvent>) -> Self {
        Self { tx, last_percent: AtomicI16::new(-1) }
    }
}

impl ProgressReporter for ChannelReporter {
    fn progress(&self, percent: u8) {
        let percent = percent.min(100);
        let prev = self.last_percent.fetch_max(percent as i16, Ordering::AcqRel);
        if (percent as i16) < prev {
            return;
        }
        let _ = self.tx.send(ProgressEvent::Percent(percent));
    }

    fn message(&self, msg: &str) {
        let _ = self.tx.send(ProgressEvent::Message(msg.to_string()));
    }
}

/// Consumer-side view keeping only the latest percent and message.
#[derive(Debug, Default)]
pub struct LatestProgress {
    pub percent: u8,
    pub message: Option<String>,
    pub finished: Option<Result<UpdateReport, SearchError>>,
}

impl LatestProgress {
    pub fn apply(&mut self, event: ProgressEvent) {
        match event {
            ProgressEvent::Percent(p) => self.percent = p,
            ProgressEvent::Message(m) => self.message = Some(m),
            ProgressEvent::Finished(result) => self.finished = Some(result),
        }
    }

    /// Apply everything currently queued without blocking.
    /// Returns false once the sender side is gone.
    pub fn drain(&mut self, rx: &Receiver<ProgressEvent>) -> bool {
        loop {
            match rx.try_recv() {
                Ok(event) => self.apply(event),
                Err(TryRecvError::Empty) => return true,
                Err(TryRecvError::Disconnected) => return false,
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished.is_some()
    }
}

/// Cooperative cancellation flag shared between a caller and an indexing run.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}
