//! Interval-based frame-rate counter
//!
//! Counts frames between periodic ticks. Each tick publishes
//! `frames / elapsed seconds` and starts a fresh sample. The first tick is
//! scheduled one full interval after `start`, so the elapsed time is never
//! near zero.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use anyhow::{ensure, Context, Result};
use contracts::{EventBus, StatusEvent};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::trace;

use crate::metrics::record_frame_rate;

/// Shortest tick period `start` accepts
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Frames counted since the last reset
#[derive(Debug, Clone, Copy)]
pub struct FrameRateSample {
    pub frame_count: u64,
    pub interval_start: Instant,
}

impl FrameRateSample {
    fn fresh() -> Self {
        Self {
            frame_count: 0,
            interval_start: Instant::now(),
        }
    }
}

#[derive(Debug)]
struct CounterState {
    running: bool,
    generation: u64,
    sample: FrameRateSample,
    ticker: Option<JoinHandle<()>>,
}

#[derive(Debug)]
struct Shared {
    interval: Duration,
    state: Mutex<CounterState>,
    rate: watch::Sender<f64>,
    events: Option<EventBus>,
}

impl Shared {
    fn state(&self) -> MutexGuard<'_, CounterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, fps: f64) {
        self.rate.send_if_modified(|current| {
            let changed = *current != fps;
            *current = fps;
            changed
        });
        record_frame_rate(fps);
        if let Some(events) = &self.events {
            events.publish_status(StatusEvent::FrameRate { fps });
        }
    }

    /// Publishes under the state lock so a tick racing `stop` cannot land
    /// after the zeroed rate.
    fn tick(&self, generation: u64) -> bool {
        let mut state = self.state();
        if !state.running || state.generation != generation {
            return false;
        }
        let now = Instant::now();
        let elapsed = now.duration_since(state.sample.interval_start).as_secs_f64();
        let fps = if elapsed > 0.0 {
            state.sample.frame_count as f64 / elapsed
        } else {
            0.0
        };
        state.sample = FrameRateSample {
            frame_count: 0,
            interval_start: now,
        };
        trace!(fps, "frame rate tick");
        self.publish(fps);
        true
    }
}

/// Frame-rate counter: Stopped or Running
///
/// Cloning yields another handle to the same counter. `add_frame` is cheap
/// and safe from any thread; `start`/`restart` need a tokio runtime.
#[derive(Debug, Clone)]
pub struct FrameRateCounter {
    shared: Arc<Shared>,
}

impl FrameRateCounter {
    /// Counter reporting every `interval`
    pub fn new(interval: Duration) -> Self {
        Self::build(interval, None)
    }

    /// Counter that also publishes `StatusEvent::FrameRate` on `events`
    pub fn with_events(interval: Duration, events: EventBus) -> Self {
        Self::build(interval, Some(events))
    }

    fn build(interval: Duration, events: Option<EventBus>) -> Self {
        let (rate, _) = watch::channel(0.0);
        Self {
            shared: Arc::new(Shared {
                interval,
                state: Mutex::new(CounterState {
                    running: false,
                    generation: 0,
                    sample: FrameRateSample::fresh(),
                    ticker: None,
                }),
                rate,
                events,
            }),
        }
    }

    /// Reset the sample and begin ticking
    pub fn start(&self) -> Result<()> {
        let mut state = self.shared.state();
        self.start_locked(&mut state)
    }

    /// Count one frame; ignored while stopped
    pub fn add_frame(&self) {
        let mut state = self.shared.state();
        if state.running {
            state.sample.frame_count += 1;
        }
    }

    /// Cancel ticking and zero the rate
    pub fn stop(&self) {
        let mut state = self.shared.state();
        Self::stop_locked(&mut state);
        self.shared.publish(0.0);
    }

    /// Stop then start with no tick in between
    pub fn restart(&self) -> Result<()> {
        let mut state = self.shared.state();
        Self::stop_locked(&mut state);
        self.start_locked(&mut state)
    }

    pub fn is_running(&self) -> bool {
        self.shared.state().running
    }

    /// Frames counted in the current sample
    pub fn frame_count(&self) -> u64 {
        self.shared.state().sample.frame_count
    }

    /// Last published rate
    pub fn rate(&self) -> f64 {
        *self.shared.rate.borrow()
    }

    /// Watch rate changes
    pub fn subscribe(&self) -> watch::Receiver<f64> {
        self.shared.rate.subscribe()
    }

    fn stop_locked(state: &mut CounterState) {
        state.running = false;
        state.generation += 1;
        state.sample.frame_count = 0;
        if let Some(ticker) = state.ticker.take() {
            ticker.abort();
        }
    }

    fn start_locked(&self, state: &mut CounterState) -> Result<()> {
        let runtime = Handle::try_current().context("frame-rate counter needs a tokio runtime")?;
        ensure!(
            self.shared.interval >= MIN_INTERVAL,
            "frame-rate interval {:?} is below {:?}",
            self.shared.interval,
            MIN_INTERVAL
        );

        if let Some(ticker) = state.ticker.take() {
            ticker.abort();
        }
        state.generation += 1;
        state.running = true;
        state.sample = FrameRateSample::fresh();

        let generation = state.generation;
        let period = self.shared.interval;
        let first_tick = state.sample.interval_start + period;
        let shared = Arc::downgrade(&self.shared);

        state.ticker = Some(runtime.spawn(async move {
            let mut ticks = time::interval_at(first_tick, period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticks.tick().await;
                let Some(shared) = shared.upgrade() else {
                    break;
                };
                if !shared.tick(generation) {
                    break;
                }
            }
        }));
        Ok(())
    }
}
