//! Scheduler counters

use std::sync::atomic::{AtomicU64, Ordering};

/// Scheduler counters, shared with whoever reports on the session
#[derive(Debug, Default)]
pub struct SchedulerMetrics {
    /// Frames copied out and handed to a step
    pub frames_accepted: AtomicU64,

    /// Frames discarded because a step was in flight
    pub frames_dropped: AtomicU64,

    /// Steps that tracked and integrated
    pub frames_processed: AtomicU64,

    /// Steps whose frame did not align
    pub tracking_failures: AtomicU64,

    /// Steps aborted by an engine error
    pub engine_errors: AtomicU64,
}

impl SchedulerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_accepted(&self) {
        self.frames_accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.frames_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_processed(&self) {
        self.frames_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_tracking_failure(&self) {
        self.tracking_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_engine_error(&self) {
        self.engine_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot
    pub fn snapshot(&self) -> SchedulerSnapshot {
        SchedulerSnapshot {
            frames_accepted: self.frames_accepted.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            frames_processed: self.frames_processed.load(Ordering::Relaxed),
            tracking_failures: self.tracking_failures.load(Ordering::Relaxed),
            engine_errors: self.engine_errors.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`SchedulerMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerSnapshot {
    pub frames_accepted: u64,
    pub frames_dropped: u64,
    pub frames_processed: u64,
    pub tracking_failures: u64,
    pub engine_errors: u64,
}

impl SchedulerSnapshot {
    /// Frames the source delivered while the scheduler was accepting
    pub fn frames_seen(&self) -> u64 {
        self.frames_accepted + self.frames_dropped
    }

    /// Dropped share of delivered frames, in percent
    pub fn drop_rate(&self) -> f64 {
        match self.frames_seen() {
            0 => 0.0,
            seen => self.frames_dropped as f64 / seen as f64 * 100.0,
        }
    }
}
