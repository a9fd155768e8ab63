//! Metric recorders
//!
//! Thin wrappers over the `metrics` macros so every crate records under the
//! same names. With no recorder installed these are no-ops.

use metrics::{counter, gauge, histogram};

/// Frame accepted by the scheduler
pub fn record_frame_accepted() {
    counter!("depth_fusion_frames_accepted_total").increment(1);
}

/// Frame dropped because a step was in flight
pub fn record_frame_dropped() {
    counter!("depth_fusion_frames_dropped_total").increment(1);
}

/// Step finished with tracking success
pub fn record_frame_processed(frame_id: u64, step_ms: f64) {
    counter!("depth_fusion_frames_processed_total").increment(1);
    gauge!("depth_fusion_last_frame_id").set(frame_id as f64);
    histogram!("depth_fusion_step_duration_ms").record(step_ms);
}

/// Step finished with tracking failure
pub fn record_tracking_failure() {
    counter!("depth_fusion_tracking_failures_total").increment(1);
}

/// Step aborted by an engine error
pub fn record_engine_error(kind: &str) {
    counter!("depth_fusion_engine_errors_total", "kind" => kind.to_string()).increment(1);
}

/// Latest frame-rate sample
pub fn record_frame_rate(fps: f64) {
    gauge!("depth_fusion_frame_rate").set(fps);
}

/// Export attempt
pub fn record_export(format: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "depth_fusion_exports_total",
        "format" => format.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Triangle count of the last written mesh
pub fn record_export_triangles(triangles: usize) {
    gauge!("depth_fusion_export_triangles").set(triangles as f64);
}

/// Online mean/min/max/std (Welford)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;
        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
            return;
        }

        self.min = self.min.min(value);
        self.max = self.max.max(value);
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn summary(&self) -> StatsSummary {
        StatsSummary {
            count: self.count,
            min: self.min,
            max: self.max,
            mean: self.mean(),
            std_dev: self.std_dev(),
        }
    }
}

/// Frozen view of a [`RunningStats`]
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            return write!(f, "N/A");
        }
        write!(
            f,
            "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
            self.min, self.max, self.mean, self.std_dev, self.count
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::default();
        for v in [4.0, 8.0, 6.0, 2.0] {
            stats.push(v);
        }

        assert_eq!(stats.count(), 4);
        assert!((stats.mean() - 5.0).abs() < 1e-10);
        assert!((stats.min() - 2.0).abs() < 1e-10);
        assert!((stats.max() - 8.0).abs() < 1e-10);
        assert!((stats.variance() - 20.0 / 3.0).abs() < 1e-10);
    }

    #[test]
    fn test_empty_summary_display() {
        assert_eq!(RunningStats::default().summary().to_string(), "N/A");
    }

    #[test]
    fn test_recorders_without_recorder_are_noops() {
        record_frame_accepted();
        record_frame_dropped();
        record_frame_processed(3, 12.5);
        record_export("stl", true);
    }
}
