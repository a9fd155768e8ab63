//! Export counters

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Counters for the export worker
#[derive(Debug, Default)]
pub struct ExportMetrics {
    succeeded: AtomicU64,
    failed: AtomicU64,
    triangles_written: AtomicU64,
    bytes_written: AtomicU64,
}

impl ExportMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&self, triangles: usize, bytes: u64) {
        self.succeeded.fetch_add(1, Ordering::Relaxed);
        self.triangles_written
            .fetch_add(triangles as u64, Ordering::Relaxed);
        self.bytes_written.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ExportMetricsSnapshot {
        ExportMetricsSnapshot {
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            triangles_written: self.triangles_written.load(Ordering::Relaxed),
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of [`ExportMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExportMetricsSnapshot {
    pub succeeded: u64,
    pub failed: u64,
    pub triangles_written: u64,
    pub bytes_written: u64,
}
