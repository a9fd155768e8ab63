//! # Scheduler
//!
//! Frame scheduler between a depth source and the reconstruction controller.
//!
//! Responsibilities:
//! - At most one reconstruction step in flight; overlapping frames are dropped
//! - Copy each accepted frame out of the source's buffer
//! - Run steps off the notification thread
//! - Publish the renderable frame, status and error events, frame-rate ticks
//!
//! ## Usage
//!
//! ```ignore
//! use scheduler::FrameScheduler;
//!
//! let scheduler = FrameScheduler::new(controller, events)?
//!     .with_frame_rate(frame_rate);
//! scheduler.attach(sensor.as_ref())?;
//!
//! let mut render = scheduler.subscribe_render();
//! while render.changed().await.is_ok() {
//!     // draw render.borrow()
//! }
//! ```

mod config;
mod error;
mod scheduler;

pub use config::{SchedulerMetrics, SchedulerSnapshot};
pub use error::{Result, SchedulerError};
pub use scheduler::{FrameScheduler, RenderFrame};
