//! DepthSource trait - depth stream abstraction
//!
//! Decouples the frame scheduler from the concrete sensor (mock, replay or a
//! real device driver).

use std::sync::Arc;

use crate::{ContractError, DepthFrameRef};

/// Frame-ready notification
///
/// Invoked on the source's own thread. The borrowed pixel buffer is only valid
/// until the callback returns, so handlers copy out what they need and return
/// quickly.
pub type DepthFrameCallback = Arc<dyn for<'a> Fn(DepthFrameRef<'a>) + Send + Sync>;

/// Wrap a closure as a [`DepthFrameCallback`]
///
/// The bound lets closures be written without spelling out the borrowed
/// frame's lifetime.
pub fn depth_callback<F>(f: F) -> DepthFrameCallback
where
    F: for<'a> Fn(DepthFrameRef<'a>) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Depth data source trait
///
/// # Example
///
/// ```ignore
/// let sensor: Box<dyn DepthSource> = DepthSourceFactory::from_config(&config)?;
/// sensor.start(depth_callback(|frame| {
///     println!("frame {} with {} samples", frame.frame_id, frame.pixels.len());
/// }))?;
/// // ... stream ...
/// sensor.stop()?;
/// ```
pub trait DepthSource: Send + Sync {
    /// Human-readable source name
    fn name(&self) -> &str;

    /// Number of samples in every frame this source emits
    fn frame_data_length(&self) -> usize;

    /// Whether the underlying device is present
    fn sensor_connected(&self) -> bool;

    /// Start streaming into `callback`
    ///
    /// # Errors
    /// - `DeviceUnavailable` when no device is connected
    /// - `DeviceInUse` when the source is already streaming
    fn start(&self, callback: DepthFrameCallback) -> Result<(), ContractError>;

    /// Stop streaming
    ///
    /// Stopping an idle source is a no-op.
    fn stop(&self) -> Result<(), ContractError>;

    /// Check if currently streaming
    fn is_streaming(&self) -> bool;
}
