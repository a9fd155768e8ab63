//! Replay Sensor - plays back a recorded depth session
//!
//! A recording is a directory holding `frames.jsonl` (one record per frame)
//! and one raw little-endian u16 file per frame. Frames are played back at
//! their original cadence, scaled by a speed multiplier.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use contracts::{ContractError, DepthFrameCallback, DepthFrameRef, DepthSource};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{DeviceError, Result};

/// Name of the frame manifest inside a recording directory
pub const MANIFEST_FILE: &str = "frames.jsonl";

/// Replay configuration
#[derive(Debug, Clone)]
pub struct ReplayConfig {
    /// Playback speed multiplier (1.0 = original speed)
    pub speed_multiplier: f64,

    /// Restart from the first frame when the recording ends
    pub loop_playback: bool,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            speed_multiplier: 1.0,
            loop_playback: false,
        }
    }
}

/// One line of `frames.jsonl`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameRecord {
    pub frame_id: u64,
    pub timestamp: f64,
    pub data_file: String,
    pub width: u32,
    pub height: u32,
}

/// Replay Sensor - plays a recording directory through `DepthSource`
pub struct ReplayDepthSensor {
    name: String,
    recording_path: PathBuf,
    records: Arc<Vec<FrameRecord>>,
    config: ReplayConfig,
    streaming: Arc<AtomicBool>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl ReplayDepthSensor {
    /// Load a recording directory
    ///
    /// # Errors
    /// - `RecordingNotFound` when the manifest cannot be opened
    /// - `InvalidRecording` for malformed records, mixed frame sizes or an empty recording
    pub fn load(recording_path: &Path, config: ReplayConfig) -> Result<Self> {
        let manifest_path = recording_path.join(MANIFEST_FILE);
        let file = File::open(&manifest_path).map_err(|e| {
            DeviceError::recording_not_found(manifest_path.display().to_string(), e.to_string())
        })?;

        let mut records = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record: FrameRecord = serde_json::from_str(&line).map_err(|e| {
                DeviceError::invalid_recording(manifest_path.display().to_string(), e.to_string())
            })?;
            records.push(record);
        }

        let Some(first) = records.first() else {
            return Err(DeviceError::invalid_recording(
                manifest_path.display().to_string(),
                "recording contains no frames",
            ));
        };
        let (width, height) = (first.width, first.height);
        if records.iter().any(|r| r.width != width || r.height != height) {
            return Err(DeviceError::invalid_recording(
                manifest_path.display().to_string(),
                "all frames must share the same size",
            ));
        }

        records.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));

        info!(
            path = %recording_path.display(),
            frames = records.len(),
            width,
            height,
            "loaded depth recording"
        );

        Ok(Self {
            name: format!("replay:{}", recording_path.display()),
            recording_path: recording_path.to_path_buf(),
            records: Arc::new(records),
            config,
            streaming: Arc::new(AtomicBool::new(false)),
            worker: Mutex::new(None),
        })
    }

    /// Number of recorded frames
    pub fn frame_count(&self) -> usize {
        self.records.len()
    }

    fn read_frame(dir: &Path, record: &FrameRecord, buffer: &mut Vec<u16>) -> Result<()> {
        let path = dir.join(&record.data_file);
        let raw = fs::read(&path)?;
        let expected = record.width as usize * record.height as usize;
        if raw.len() != expected * 2 {
            return Err(DeviceError::invalid_recording(
                path.display().to_string(),
                format!("expected {} bytes, found {}", expected * 2, raw.len()),
            ));
        }
        buffer.clear();
        buffer.extend(
            raw.chunks_exact(2)
                .map(|c| u16::from_le_bytes([c[0], c[1]])),
        );
        Ok(())
    }

    fn playback_loop(
        name: String,
        dir: PathBuf,
        records: Arc<Vec<FrameRecord>>,
        config: ReplayConfig,
        streaming: Arc<AtomicBool>,
        callback: DepthFrameCallback,
    ) {
        let mut buffer = Vec::new();
        let speed = config.speed_multiplier.max(f64::EPSILON);

        'playback: loop {
            let start = Instant::now();
            let t0 = records.first().map(|r| r.timestamp).unwrap_or(0.0);

            for record in records.iter() {
                if !streaming.load(Ordering::Relaxed) {
                    break 'playback;
                }

                let due = Duration::try_from_secs_f64((record.timestamp - t0) / speed)
                    .unwrap_or_default();
                if let Some(wait) = due.checked_sub(start.elapsed()) {
                    thread::sleep(wait);
                }

                if let Err(e) = Self::read_frame(&dir, record, &mut buffer) {
                    warn!(sensor = %name, frame_id = record.frame_id, error = %e, "skipping unreadable frame");
                    continue;
                }

                callback(DepthFrameRef {
                    frame_id: record.frame_id,
                    timestamp: record.timestamp,
                    width: record.width,
                    height: record.height,
                    pixels: &buffer,
                });
            }

            if !config.loop_playback {
                break;
            }
            debug!(sensor = %name, "replay looping");
        }

        streaming.store(false, Ordering::SeqCst);
        debug!(sensor = %name, "replay finished");
    }
}

impl DepthSource for ReplayDepthSensor {
    fn name(&self) -> &str {
        &self.name
    }

    fn frame_data_length(&self) -> usize {
        self.records
            .first()
            .map(|r| r.width as usize * r.height as usize)
            .unwrap_or(0)
    }

    fn sensor_connected(&self) -> bool {
        self.recording_path.join(MANIFEST_FILE).is_file()
    }

    fn start(&self, callback: DepthFrameCallback) -> std::result::Result<(), ContractError> {
        if !self.sensor_connected() {
            return Err(ContractError::device_unavailable(format!(
                "recording '{}' is no longer available",
                self.recording_path.display()
            )));
        }

        if self.streaming.swap(true, Ordering::SeqCst) {
            return Err(ContractError::device_in_use(format!(
                "'{}' is already streaming",
                self.name
            )));
        }

        let name = self.name.clone();
        let dir = self.recording_path.clone();
        let records = self.records.clone();
        let config = self.config.clone();
        let streaming = self.streaming.clone();

        let handle = thread::Builder::new()
            .name("depth-replay".to_string())
            .spawn(move || Self::playback_loop(name, dir, records, config, streaming, callback))
            .map_err(|e| {
                self.streaming.store(false, Ordering::SeqCst);
                ContractError::from(e)
            })?;

        if let Ok(mut worker) = self.worker.lock() {
            *worker = Some(handle);
        }
        Ok(())
    }

    fn stop(&self) -> std::result::Result<(), ContractError> {
        self.streaming.store(false, Ordering::SeqCst);

        let handle = match self.worker.lock() {
            Ok(mut worker) => worker.take(),
            Err(_) => None,
        };
        if let Some(handle) = handle {
            if handle.thread().id() != thread::current().id() && handle.join().is_err() {
                warn!(sensor = %self.name, "replay thread panicked");
            }
        }
        Ok(())
    }

    fn is_streaming(&self) -> bool {
        self.streaming.load(Ordering::Relaxed)
    }
}

impl Drop for ReplayDepthSensor {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

/// Writes a recording directory readable by [`ReplayDepthSensor`]
pub struct RecordingWriter {
    dir: PathBuf,
    manifest: BufWriter<File>,
}

impl RecordingWriter {
    /// Create the directory and an empty manifest
    pub fn create(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)?;
        let manifest = BufWriter::new(File::create(dir.join(MANIFEST_FILE))?);
        Ok(Self {
            dir: dir.to_path_buf(),
            manifest,
        })
    }

    /// Append one frame
    pub fn write_frame(&mut self, frame: &DepthFrameRef<'_>) -> Result<()> {
        let data_file = format!("{:06}.raw", frame.frame_id);
        let mut raw = Vec::with_capacity(frame.pixels.len() * 2);
        for pixel in frame.pixels {
            raw.extend_from_slice(&pixel.to_le_bytes());
        }
        fs::write(self.dir.join(&data_file), raw)?;

        let record = FrameRecord {
            frame_id: frame.frame_id,
            timestamp: frame.timestamp,
            data_file,
            width: frame.width,
            height: frame.height,
        };
        let line = serde_json::to_string(&record)
            .map_err(|e| DeviceError::invalid_recording(self.dir.display().to_string(), e.to_string()))?;
        writeln!(self.manifest, "{line}")?;
        Ok(())
    }

    /// Flush the manifest
    pub fn finish(mut self) -> Result<()> {
        self.manifest.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::depth_callback;
    use tempfile::tempdir;

    fn write_recording(dir: &Path, frames: u64) {
        let mut writer = RecordingWriter::create(dir).unwrap();
        for frame_id in 1..=frames {
            let pixels = vec![frame_id as u16 * 100; 4 * 3];
            writer
                .write_frame(&DepthFrameRef {
                    frame_id,
                    timestamp: frame_id as f64 * 0.01,
                    width: 4,
                    height: 3,
                    pixels: &pixels,
                })
                .unwrap();
        }
        writer.finish().unwrap();
    }

    #[test]
    fn test_load_recording() {
        let dir = tempdir().unwrap();
        write_recording(dir.path(), 5);

        let sensor = ReplayDepthSensor::load(dir.path(), ReplayConfig::default()).unwrap();
        assert_eq!(sensor.frame_count(), 5);
        assert_eq!(sensor.frame_data_length(), 12);
        assert!(sensor.sensor_connected());
    }

    #[test]
    fn test_missing_recording() {
        let dir = tempdir().unwrap();
        let result = ReplayDepthSensor::load(&dir.path().join("nope"), ReplayConfig::default());
        assert!(matches!(result, Err(DeviceError::RecordingNotFound { .. })));
    }

    #[test]
    fn test_replay_delivers_frames_in_order() {
        let dir = tempdir().unwrap();
        write_recording(dir.path(), 4);

        let sensor = ReplayDepthSensor::load(
            dir.path(),
            ReplayConfig {
                speed_multiplier: 10.0,
                loop_playback: false,
            },
        )
        .unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        sensor
            .start(depth_callback(move |frame| {
                seen_clone
                    .lock()
                    .unwrap()
                    .push((frame.frame_id, frame.pixels[0]));
            }))
            .unwrap();

        thread::sleep(Duration::from_millis(100));
        sensor.stop().unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![(1, 100), (2, 200), (3, 300), (4, 400)]
        );
    }
}
