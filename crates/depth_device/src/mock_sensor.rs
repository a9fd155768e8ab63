//! Mock depth sensor implementation
//!
//! Implements `DepthSource`, generating a synthetic scene in a background
//! thread: a flat back wall with a sphere drifting across it. Used for testing
//! and development without a physical depth camera.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use contracts::{ContractError, DepthFrameCallback, DepthFrameRef, DepthSource, SensorConfig};
use tracing::{debug, trace, warn};

/// Mock sensor configuration
#[derive(Debug, Clone)]
pub struct MockDepthSensorConfig {
    /// Depth image width
    pub width: u32,
    /// Depth image height
    pub height: u32,
    /// Send frequency (Hz)
    pub frequency_hz: f64,
    /// Simulate a plugged-in device
    pub connected: bool,
    /// Back wall distance (mm)
    pub wall_depth_mm: u16,
    /// Sphere radius as a fraction of image height
    pub sphere_radius: f32,
    /// Stop after this many frames (None = unlimited)
    pub max_frames: Option<u64>,
}

impl Default for MockDepthSensorConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            frequency_hz: 30.0,
            connected: true,
            wall_depth_mm: 2000,
            sphere_radius: 0.2,
            max_frames: None,
        }
    }
}

impl MockDepthSensorConfig {
    /// Build from session sensor settings
    pub fn from_sensor_config(config: &SensorConfig) -> Self {
        Self {
            width: config.width,
            height: config.height,
            frequency_hz: config.frequency_hz,
            ..Default::default()
        }
    }
}

/// Mock depth sensor
///
/// Frames are rendered into one reused buffer, so the pixels handed to the
/// callback are overwritten by the next frame.
pub struct MockDepthSensor {
    name: String,
    config: MockDepthSensorConfig,
    streaming: Arc<AtomicBool>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl MockDepthSensor {
    /// Create new mock sensor
    pub fn new(name: impl Into<String>, config: MockDepthSensorConfig) -> Self {
        Self {
            name: name.into(),
            config,
            streaming: Arc::new(AtomicBool::new(false)),
            worker: Mutex::new(None),
        }
    }

    /// Render the synthetic scene for `frame_id` into `buffer`
    fn render_scene(config: &MockDepthSensorConfig, frame_id: u64, buffer: &mut [u16]) {
        let width = config.width as usize;
        let height = config.height as usize;
        let radius = config.sphere_radius * config.height as f32;
        let radius_mm = radius * 4.0;

        let cx = ((frame_id * 4) % config.width.max(1) as u64) as f32;
        let cy = height as f32 / 2.0;

        for (row_idx, row) in buffer.chunks_exact_mut(width).enumerate().take(height) {
            let dy = row_idx as f32 - cy;
            for (col_idx, pixel) in row.iter_mut().enumerate() {
                let dx = col_idx as f32 - cx;
                let d2 = dx * dx + dy * dy;
                *pixel = if d2 < radius * radius {
                    let bulge = (1.0 - d2 / (radius * radius)).sqrt() * radius_mm;
                    config.wall_depth_mm.saturating_sub(bulge as u16)
                } else {
                    config.wall_depth_mm
                };
            }
        }
    }
}

impl DepthSource for MockDepthSensor {
    fn name(&self) -> &str {
        &self.name
    }

    fn frame_data_length(&self) -> usize {
        self.config.width as usize * self.config.height as usize
    }

    fn sensor_connected(&self) -> bool {
        self.config.connected
    }

    fn start(&self, callback: DepthFrameCallback) -> Result<(), ContractError> {
        if !self.config.connected {
            return Err(ContractError::device_unavailable(format!(
                "mock sensor '{}' is not connected",
                self.name
            )));
        }

        let interval = Duration::try_from_secs_f64(1.0 / self.config.frequency_hz).map_err(|_| {
            ContractError::config_validation(
                "sensor.frequency_hz",
                format!("no usable frame period for {} Hz", self.config.frequency_hz),
            )
        })?;

        if self.streaming.swap(true, Ordering::SeqCst) {
            return Err(ContractError::device_in_use(format!(
                "mock sensor '{}' is already streaming",
                self.name
            )));
        }

        let name = self.name.clone();
        let config = self.config.clone();
        let streaming = self.streaming.clone();

        let handle = thread::Builder::new()
            .name(format!("depth-{name}"))
            .spawn(move || {
                let mut buffer = vec![0u16; config.width as usize * config.height as usize];
                let mut frame_id: u64 = 0;
                let start_time = Instant::now();

                debug!(
                    sensor = %name,
                    width = config.width,
                    height = config.height,
                    frequency_hz = config.frequency_hz,
                    "mock depth sensor started"
                );

                while streaming.load(Ordering::Relaxed) {
                    if config.max_frames.is_some_and(|max| frame_id >= max) {
                        streaming.store(false, Ordering::SeqCst);
                        break;
                    }

                    frame_id += 1;
                    Self::render_scene(&config, frame_id, &mut buffer);

                    callback(DepthFrameRef {
                        frame_id,
                        timestamp: start_time.elapsed().as_secs_f64(),
                        width: config.width,
                        height: config.height,
                        pixels: &buffer,
                    });

                    trace!(sensor = %name, frame_id, "mock depth frame sent");

                    thread::sleep(interval);
                }

                debug!(sensor = %name, frames = frame_id, "mock depth sensor stopped");
            })
            .map_err(|e| {
                self.streaming.store(false, Ordering::SeqCst);
                ContractError::from(e)
            })?;

        if let Ok(mut worker) = self.worker.lock() {
            *worker = Some(handle);
        }
        Ok(())
    }

    fn stop(&self) -> Result<(), ContractError> {
        self.streaming.store(false, Ordering::SeqCst);

        let handle = match self.worker.lock() {
            Ok(mut worker) => worker.take(),
            Err(_) => None,
        };

        // Joining from the sensor's own thread (stop called inside the callback) would deadlock
        if let Some(handle) = handle {
            if handle.thread().id() != thread::current().id() && handle.join().is_err() {
                warn!(sensor = %self.name, "mock sensor thread panicked");
            }
        }
        Ok(())
    }

    fn is_streaming(&self) -> bool {
        self.streaming.load(Ordering::Relaxed)
    }
}

impl Drop for MockDepthSensor {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}
