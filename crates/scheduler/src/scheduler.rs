//! Frame scheduler
//!
//! Bridges a depth source to the reconstruction controller. At most one step
//! runs at a time; a frame that arrives while a step is in flight is dropped,
//! not queued. Accepted frames are copied out of the source's buffer before
//! the notification returns and processed on tokio's blocking pool.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use contracts::{
    depth_callback, ColorBuffer, ContractError, DepthFrame, DepthFrameCallback, DepthFrameRef,
    DepthSource, EventBus, StatusEvent,
};
use observability::FrameRateCounter;
use reconstruction::{SharedController, StepOutcome};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{error, info, instrument, trace, warn};

use crate::config::{SchedulerMetrics, SchedulerSnapshot};
use crate::error::{Result, SchedulerError};

/// Latest shaded view of the reconstruction
#[derive(Debug, Clone, PartialEq)]
pub struct RenderFrame {
    pub frame_id: u64,
    pub color: ColorBuffer,
}

struct Inner {
    controller: SharedController,
    runtime: Handle,
    in_flight: AtomicBool,
    accepting: AtomicBool,
    metrics: Arc<SchedulerMetrics>,
    events: EventBus,
    frame_rate: Option<FrameRateCounter>,
    render_tx: watch::Sender<Option<RenderFrame>>,
    completed_tx: watch::Sender<u64>,
}

/// Clears the in-flight flag on every exit path of a step, panics included
struct InFlightGuard(Arc<Inner>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.in_flight.store(false, Ordering::Release);
        self.0.completed_tx.send_modify(|steps| *steps += 1);
    }
}

/// Frame scheduler (cheap to clone)
#[derive(Clone)]
pub struct FrameScheduler {
    inner: Arc<Inner>,
}

impl FrameScheduler {
    /// Create a scheduler bound to the current tokio runtime
    ///
    /// The scheduler starts out accepting frames.
    pub fn new(controller: SharedController, events: EventBus) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|_| SchedulerError::NoRuntime)?;
        let (render_tx, _) = watch::channel(None);
        let (completed_tx, _) = watch::channel(0);

        Ok(Self {
            inner: Arc::new(Inner {
                controller,
                runtime,
                in_flight: AtomicBool::new(false),
                accepting: AtomicBool::new(true),
                metrics: Arc::new(SchedulerMetrics::new()),
                events,
                frame_rate: None,
                render_tx,
                completed_tx,
            }),
        })
    }

    /// Count processed frames on `counter`
    ///
    /// Must be called before the scheduler is cloned or attached.
    pub fn with_frame_rate(mut self, counter: FrameRateCounter) -> Self {
        if let Some(inner) = Arc::get_mut(&mut self.inner) {
            inner.frame_rate = Some(counter);
        } else {
            warn!("frame-rate counter ignored: scheduler already shared");
        }
        self
    }

    /// Frame-ready handler
    ///
    /// Returns whether the frame was accepted. Never blocks the caller.
    pub fn on_frame_ready(&self, frame: DepthFrameRef<'_>) -> bool {
        let inner = &self.inner;
        if !inner.accepting.load(Ordering::Acquire) {
            trace!(frame_id = frame.frame_id, "scheduler stopped, frame ignored");
            return false;
        }

        if inner
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            inner.metrics.record_dropped();
            observability::record_frame_dropped();
            trace!(frame_id = frame.frame_id, "step in flight, frame dropped");
            return false;
        }

        let guard = InFlightGuard(inner.clone());
        let owned = DepthFrame::copy_from(&frame);
        inner.metrics.record_accepted();
        observability::record_frame_accepted();
        trace!(frame_id = owned.frame_id, "frame accepted");

        let step = inner.clone();
        // A shut-down runtime drops the closure, and with it the guard.
        drop(inner.runtime.spawn_blocking(move || {
            let _guard = guard;
            step.process_once(owned);
        }));
        true
    }

    /// Callback to hand to a [`DepthSource`]
    pub fn frame_callback(&self) -> DepthFrameCallback {
        let scheduler = self.clone();
        depth_callback(move |frame| {
            scheduler.on_frame_ready(frame);
        })
    }

    /// Start `source` feeding this scheduler
    #[instrument(name = "scheduler_attach", skip(self, source), fields(source = source.name()))]
    pub fn attach(&self, source: &dyn DepthSource) -> Result<()> {
        self.inner.accepting.store(true, Ordering::Release);
        source
            .start(self.frame_callback())
            .map_err(|error| SchedulerError::Source {
                source_name: source.name().to_string(),
                error,
            })
            .inspect_err(|e| {
                if let SchedulerError::Source { error, .. } = e {
                    self.inner.events.report(error, None);
                }
            })?;

        info!(frame_data_length = source.frame_data_length(), "depth source attached");
        self.inner.events.publish_status(StatusEvent::SensorStarted {
            source: source.name().to_string(),
        });
        Ok(())
    }

    /// Stop accepting frames and stop `source`
    #[instrument(name = "scheduler_detach", skip(self, source), fields(source = source.name()))]
    pub fn detach(&self, source: &dyn DepthSource) -> Result<()> {
        self.stop();
        source.stop().map_err(|error| SchedulerError::Source {
            source_name: source.name().to_string(),
            error,
        })?;
        self.inner.events.publish_status(StatusEvent::SensorStopped {
            source: source.name().to_string(),
        });
        Ok(())
    }

    /// Stop accepting frames; a step already in flight runs to completion
    pub fn stop(&self) {
        if self.inner.accepting.swap(false, Ordering::AcqRel) {
            info!("frame scheduler stopped");
        }
    }

    /// Accept frames again after [`stop`](Self::stop)
    pub fn resume(&self) {
        self.inner.accepting.store(true, Ordering::Release);
    }

    pub fn is_accepting(&self) -> bool {
        self.inner.accepting.load(Ordering::Acquire)
    }

    /// Whether a step is in flight
    pub fn is_busy(&self) -> bool {
        self.inner.in_flight.load(Ordering::Acquire)
    }

    /// Wait until no step is in flight
    pub async fn wait_idle(&self) {
        let mut completed = self.inner.completed_tx.subscribe();
        while self.is_busy() {
            if completed.changed().await.is_err() {
                break;
            }
        }
    }

    /// Steps finished so far, including failed ones
    pub fn completed_steps(&self) -> u64 {
        *self.inner.completed_tx.borrow()
    }

    pub fn metrics(&self) -> Arc<SchedulerMetrics> {
        self.inner.metrics.clone()
    }

    pub fn snapshot(&self) -> SchedulerSnapshot {
        self.inner.metrics.snapshot()
    }

    /// Watch the renderable frame
    pub fn subscribe_render(&self) -> watch::Receiver<Option<RenderFrame>> {
        self.inner.render_tx.subscribe()
    }

    pub fn latest_frame(&self) -> Option<RenderFrame> {
        self.inner.render_tx.borrow().clone()
    }

    pub fn controller(&self) -> &SharedController {
        &self.inner.controller
    }
}

impl Inner {
    fn process_once(&self, frame: DepthFrame) {
        let frame_id = frame.frame_id;
        let started = Instant::now();
        let outcome = self.controller.lock().process(&frame);

        match outcome {
            Ok(StepOutcome::Tracked(color)) => {
                let step_ms = started.elapsed().as_secs_f64() * 1000.0;
                self.metrics.record_processed();
                observability::record_frame_processed(frame_id, step_ms);
                trace!(frame_id, step_ms, "frame integrated");

                self.render_tx.send_replace(Some(RenderFrame { frame_id, color }));
                self.events
                    .publish_status(StatusEvent::FrameProcessed { frame_id });
                if let Some(frame_rate) = &self.frame_rate {
                    frame_rate.add_frame();
                }
            }
            Ok(StepOutcome::TrackingFailed) => {
                self.metrics.record_tracking_failure();
                observability::record_tracking_failure();
                warn!(frame_id, "tracking failed");
                self.events
                    .report(&ContractError::TrackingFailed { frame_id }, Some(frame_id));
            }
            Err(e) => {
                let err = ContractError::from(e);
                self.metrics.record_engine_error();
                observability::record_engine_error(&format!("{:?}", err.kind()));
                error!(frame_id, error = %err, "reconstruction step failed");
                self.events.report(&err, Some(frame_id));
            }
        }
    }
}

impl std::fmt::Debug for FrameScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameScheduler")
            .field("accepting", &self.is_accepting())
            .field("busy", &self.is_busy())
            .field("metrics", &self.snapshot())
            .finish()
    }
}
