//! Session orchestrator - wires the depth source, scheduler, controller and exporter.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use contracts::{
    ContractError, DepthSource, ErrorEvent, EventBus, EventSubscriber, SessionBlueprint, StatusEvent,
};
use depth_device::DepthSourceFactory;
use exporter::{ExportDestination, ExportHandle, ExportRequest, MeshExporter};
use observability::{FrameRateCounter, RunningStats};
use reconstruction::{ControllerSettings, MockEngineFactory, ReconstructionController, SharedController};
use scheduler::FrameScheduler;
use tracing::{debug, info, instrument, trace, warn};

use super::{SessionStats, StopReason};
use crate::error::CliError;

const POLL_INTERVAL: Duration = Duration::from_millis(100);
const EXPORT_QUEUE_CAPACITY: usize = 4;

/// Session configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Validated session blueprint
    pub blueprint: SessionBlueprint,

    /// Stop after this many processed frames (None = unlimited)
    pub max_frames: Option<u64>,

    /// Stop after this long (None = until the source ends)
    pub duration: Option<Duration>,

    /// Export the mesh here when the session ends (None = no export)
    pub export: Option<ExportDestination>,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// One reconstruction session
pub struct Session {
    config: SessionConfig,
}

/// Running totals fed by the event bus
#[derive(Default)]
struct EventTally {
    frame_rate: RunningStats,
    errors: u64,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        Self { config }
    }

    /// Run until a stop condition or `shutdown` resolves
    ///
    /// Shutdown stops accepting frames, lets the in-flight step finish, runs
    /// the requested export and disposes the engine.
    #[instrument(name = "session_run", skip_all)]
    pub async fn run(self, shutdown: impl Future<Output = ()>) -> Result<SessionStats> {
        let blueprint = &self.config.blueprint;

        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        let (events, subscriber) = EventBus::new(
            blueprint.telemetry.status_channel_capacity,
            blueprint.telemetry.error_channel_capacity,
        );

        // Engine
        let settings = ControllerSettings::from(&blueprint.reconstruction);
        let parameters = settings.parameters;
        let controller = SharedController::new(
            ReconstructionController::new(Arc::new(MockEngineFactory::default()), settings)
                .with_events(events.clone()),
        );
        if let Err(e) = controller.lock().create(parameters) {
            let error = ContractError::from(e);
            events.report(&error, None);
            return Err(CliError::session(format!("engine creation failed: {error}")).into());
        }

        let started = Instant::now();
        let mut tally = EventTally::default();

        // Frame pipeline
        let interval = Duration::try_from_secs_f64(blueprint.telemetry.frame_rate_interval_secs)
            .context("Invalid frame-rate interval")?;
        let frame_rate = FrameRateCounter::with_events(interval, events.clone());
        let scheduler = FrameScheduler::new(controller.clone(), events.clone())?
            .with_frame_rate(frame_rate.clone());

        let source = DepthSourceFactory::from_config(&blueprint.sensor)
            .context("Failed to create depth source")?;

        frame_rate.start()?;
        scheduler
            .attach(source.as_ref())
            .context("Failed to start depth source")?;
        info!(source = source.name(), "Session started");

        let stop_reason = self
            .stream(&scheduler, source.as_ref(), &subscriber, &mut tally, shutdown)
            .await;
        info!(reason = %stop_reason, "Stopping session");

        if let Err(e) = scheduler.detach(source.as_ref()) {
            warn!(error = %e, "Failed to stop depth source cleanly");
        }
        scheduler.wait_idle().await;
        frame_rate.stop();

        let mut stats = SessionStats {
            source: source.name().to_string(),
            stop_reason,
            ..Default::default()
        };

        if let Some(destination) = self.config.export.clone() {
            let handle = ExportHandle::spawn(
                MeshExporter::from_config(&blueprint.export),
                Arc::new(controller.clone()),
                events.clone(),
                EXPORT_QUEUE_CAPACITY,
            );
            let request = ExportRequest {
                destination,
                detail_level: blueprint.export.detail_level,
            };
            match handle.export(request).await {
                Ok(report) => stats.export = Some(report),
                Err(e) => stats.export_error = Some(e.to_string()),
            }
            handle.shutdown().await;
        }

        drain_events(&subscriber, &mut tally);

        {
            let mut controller = controller.lock();
            let t = controller.pose().translation();
            stats.final_translation = [t.x, t.y, t.z];
            controller.dispose();
        }

        stats.duration = started.elapsed();
        stats.scheduler = scheduler.snapshot();
        stats.frame_rate = tally.frame_rate.summary();
        stats.error_events = tally.errors;
        stats.dropped_events = events.dropped_events();
        Ok(stats)
    }

    /// Pump events until a stop condition holds
    async fn stream(
        &self,
        scheduler: &FrameScheduler,
        source: &dyn DepthSource,
        subscriber: &EventSubscriber,
        tally: &mut EventTally,
        shutdown: impl Future<Output = ()>,
    ) -> StopReason {
        let duration = self.config.duration;
        let deadline = async move {
            match duration {
                Some(d) => tokio::time::sleep(d).await,
                None => std::future::pending().await,
            }
        };
        tokio::pin!(shutdown, deadline);

        let mut poll = tokio::time::interval(POLL_INTERVAL);

        loop {
            tokio::select! {
                _ = &mut shutdown => return StopReason::Signal,
                _ = &mut deadline => return StopReason::Deadline,
                Ok(event) = subscriber.status.recv() => {
                    on_status(&event, tally);
                    if self.frame_limit_reached(scheduler) {
                        return StopReason::FrameLimit;
                    }
                }
                Ok(event) = subscriber.errors.recv() => on_error(&event, tally),
                _ = poll.tick() => {
                    if self.frame_limit_reached(scheduler) {
                        return StopReason::FrameLimit;
                    }
                    if !source.is_streaming() && !scheduler.is_busy() {
                        return StopReason::SourceEnded;
                    }
                }
            }
        }
    }

    fn frame_limit_reached(&self, scheduler: &FrameScheduler) -> bool {
        self.config
            .max_frames
            .is_some_and(|max| scheduler.snapshot().frames_processed >= max)
    }
}

fn drain_events(subscriber: &EventSubscriber, tally: &mut EventTally) {
    while let Ok(event) = subscriber.status.try_recv() {
        on_status(&event, tally);
    }
    while let Ok(event) = subscriber.errors.try_recv() {
        on_error(&event, tally);
    }
}

fn on_status(event: &StatusEvent, tally: &mut EventTally) {
    match event {
        StatusEvent::FrameProcessed { frame_id } => trace!(frame_id, "frame processed"),
        StatusEvent::FrameRate { fps } => {
            tally.frame_rate.push(*fps);
            info!(fps = format!("{fps:.1}"), "frame rate");
        }
        StatusEvent::ExportComplete {
            path,
            format,
            triangles,
        } => info!(path = %path.display(), format, triangles, "mesh exported"),
        other => debug!(event = ?other, "session status"),
    }
}

fn on_error(event: &ErrorEvent, tally: &mut EventTally) {
    tally.errors += 1;
    warn!(
        kind = ?event.kind,
        frame_id = ?event.frame_id,
        message = %event.message,
        "session error"
    );
}
