//! Progress reporting for long refresh runs.
//!
//! Sinks are composed rather than normalized: every engine queried reports
//! up to its scan limit, and a parent tracker accumulates the raw values. A
//! run over two engines therefore ends at twice the per-engine limit, and
//! displays divide by the expected total themselves.

use std::sync::Arc;
use std::sync::atomic::{AtomicI32, Ordering};

use tokio::sync::watch;

/// Receiver of progress values. Implementations must tolerate calls from
/// whatever thread the work happens to run on.
pub trait ProgressSink: Send + Sync {
    fn update(&self, value: i32);
}

impl<F> ProgressSink for F
where
    F: Fn(i32) + Send + Sync,
{
    fn update(&self, value: i32) {
        self(value);
    }
}

/// Forwards values unchanged while remembering the latest one, so a caller
/// can offset the next child from wherever the previous one stopped.
pub struct TrackingProgress {
    current: AtomicI32,
    target: Arc<dyn ProgressSink>,
}

impl TrackingProgress {
    #[must_use]
    pub fn new(target: Arc<dyn ProgressSink>) -> Self {
        Self {
            current: AtomicI32::new(0),
            target,
        }
    }

    /// Latest value seen, zero before the first update.
    #[must_use]
    pub fn current(&self) -> i32 {
        self.current.load(Ordering::Acquire)
    }
}

impl ProgressSink for TrackingProgress {
    fn update(&self, value: i32) {
        self.current.store(value, Ordering::Release);
        self.target.update(value);
    }
}

/// Shifts every value by a fixed base before forwarding, placing one child's
/// contribution after everything already accumulated.
pub struct OffsetProgress {
    base: i32,
    target: Arc<dyn ProgressSink>,
}

impl OffsetProgress {
    #[must_use]
    pub fn new(base: i32, target: Arc<dyn ProgressSink>) -> Self {
        Self { base, target }
    }
}

impl ProgressSink for OffsetProgress {
    fn update(&self, value: i32) {
        self.target.update(self.base + value);
    }
}

/// Bridge into a UI or any other observer: updates land in a watch channel
/// and the receiver always sees the most recent value.
pub struct WatchProgress {
    tx: watch::Sender<i32>,
}

impl WatchProgress {
    #[must_use]
    pub fn channel() -> (Self, watch::Receiver<i32>) {
        let (tx, rx) = watch::channel(0);
        (Self { tx }, rx)
    }
}

impl ProgressSink for WatchProgress {
    fn update(&self, value: i32) {
        // A closed receiver just means nobody is watching any more.
        self.tx.send_replace(value);
    }
}
