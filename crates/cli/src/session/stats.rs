//! Session statistics.

use std::time::Duration;

use exporter::ExportReport;
use observability::StatsSummary;
use scheduler::SchedulerSnapshot;

/// Why the frame loop ended
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StopReason {
    /// `--max-frames` reached
    FrameLimit,
    /// `--duration` elapsed
    Deadline,
    /// The depth source stopped streaming on its own
    #[default]
    SourceEnded,
    /// Ctrl+C or SIGTERM
    Signal,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::FrameLimit => "frame limit reached",
            Self::Deadline => "duration elapsed",
            Self::SourceEnded => "depth source ended",
            Self::Signal => "shutdown signal",
        };
        f.write_str(text)
    }
}

/// Statistics from a session run
#[derive(Debug, Clone, Default)]
pub struct SessionStats {
    /// Depth source name
    pub source: String,

    /// Wall time from engine creation to disposal
    pub duration: Duration,

    pub stop_reason: StopReason,

    /// Scheduler counters at shutdown
    pub scheduler: SchedulerSnapshot,

    /// Reported frame-rate samples
    pub frame_rate: StatsSummary,

    /// Error events received on the bus
    pub error_events: u64,

    /// Events lost to full channels
    pub dropped_events: u64,

    /// Camera translation at shutdown (metres)
    pub final_translation: [f32; 3],

    pub export: Option<ExportReport>,

    pub export_error: Option<String>,
}

impl SessionStats {
    /// Processed frames per second over the whole session
    pub fn fps(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.scheduler.frames_processed as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n=== Session Statistics ===\n");

        println!("Overview");
        println!("   ├─ Source: {}", self.source);
        println!("   ├─ Stopped: {}", self.stop_reason);
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   └─ Average FPS: {:.2}", self.fps());

        let s = &self.scheduler;
        println!("\nScheduler");
        println!("   ├─ Frames accepted: {}", s.frames_accepted);
        println!(
            "   ├─ Frames dropped: {} ({:.2}%)",
            s.frames_dropped,
            s.drop_rate()
        );
        println!("   ├─ Frames processed: {}", s.frames_processed);
        println!("   ├─ Tracking failures: {}", s.tracking_failures);
        println!("   └─ Engine errors: {}", s.engine_errors);

        println!("\nTelemetry");
        println!("   ├─ Frame rate: {}", self.frame_rate);
        println!("   ├─ Error events: {}", self.error_events);
        println!("   ├─ Dropped events: {}", self.dropped_events);
        let [x, y, z] = self.final_translation;
        println!("   └─ Final camera position: ({x:.3}, {y:.3}, {z:.3}) m");

        if let Some(report) = &self.export {
            println!("\nExport");
            println!("   ├─ File: {}", report.path.display());
            println!("   ├─ Format: {}", report.format);
            println!("   ├─ Triangles: {}", report.triangles);
            println!("   └─ Bytes: {}", report.bytes_written);
        }
        if let Some(error) = &self.export_error {
            println!("\nExport failed: {error}");
        }

        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fps() {
        let stats = SessionStats {
            duration: Duration::from_secs(4),
            scheduler: SchedulerSnapshot {
                frames_processed: 10,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!((stats.fps() - 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_fps_zero_duration() {
        assert_eq!(SessionStats::default().fps(), 0.0);
    }
}
