//! SessionBlueprint - Config Loader output
//!
//! Describes a complete capture session: depth source, reconstruction volume,
//! export policy and telemetry.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::{DepthConversion, MeshFormat, ReconstructionParameters};

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionBlueprint {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Depth source settings
    #[serde(default)]
    pub sensor: SensorConfig,

    /// Reconstruction volume settings
    #[serde(default)]
    pub reconstruction: ReconstructionConfig,

    /// Mesh export settings
    #[serde(default)]
    pub export: ExportConfig,

    /// Telemetry settings
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl Default for SessionBlueprint {
    fn default() -> Self {
        Self {
            version: ConfigVersion::V1,
            sensor: SensorConfig::default(),
            reconstruction: ReconstructionConfig::default(),
            export: ExportConfig::default(),
            telemetry: TelemetryConfig::default(),
        }
    }
}

/// Depth source kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    /// Synthetic scene generator
    #[default]
    Mock,
    /// Recorded session on disk
    Replay,
}

/// Depth source settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorConfig {
    #[serde(default)]
    pub kind: SensorKind,

    /// Depth image width (pixels)
    #[serde(default = "default_width")]
    pub width: u32,

    /// Depth image height (pixels)
    #[serde(default = "default_height")]
    pub height: u32,

    /// Frame rate (Hz)
    #[serde(default = "default_frequency_hz")]
    pub frequency_hz: f64,

    /// Recording directory (replay only)
    #[serde(default)]
    pub replay_path: Option<PathBuf>,

    /// Restart the recording when it ends
    #[serde(default)]
    pub replay_loop: bool,

    /// Playback speed multiplier (1.0 = original cadence)
    #[serde(default = "default_replay_speed")]
    pub replay_speed: f64,
}

fn default_width() -> u32 {
    640
}

fn default_height() -> u32 {
    480
}

fn default_frequency_hz() -> f64 {
    30.0
}

fn default_replay_speed() -> f64 {
    1.0
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            kind: SensorKind::Mock,
            width: default_width(),
            height: default_height(),
            frequency_hz: default_frequency_hz(),
            replay_path: None,
            replay_loop: false,
            replay_speed: default_replay_speed(),
        }
    }
}

/// Reconstruction volume settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconstructionConfig {
    /// Volume parameters (voxel density + resolution)
    #[serde(flatten)]
    pub parameters: ReconstructionParameters,

    /// Near depth clip (metres)
    #[serde(default = "default_min_depth_clip")]
    pub min_depth_clip: f32,

    /// Far depth clip (metres)
    #[serde(default = "default_max_depth_clip")]
    pub max_depth_clip: f32,

    /// Shift the volume away from the sensor by the near clip on reset
    #[serde(default = "default_true")]
    pub translate_reset_pose_by_min_depth: bool,

    /// Mirror depth rows before integration
    #[serde(default)]
    pub mirror_depth: bool,
}

fn default_min_depth_clip() -> f32 {
    0.35
}

fn default_max_depth_clip() -> f32 {
    8.0
}

fn default_true() -> bool {
    true
}

impl ReconstructionConfig {
    /// Conversion settings handed to the engine
    pub fn depth_conversion(&self) -> DepthConversion {
        DepthConversion {
            min_depth_clip: self.min_depth_clip,
            max_depth_clip: self.max_depth_clip,
            mirror: self.mirror_depth,
        }
    }
}

impl Default for ReconstructionConfig {
    fn default() -> Self {
        Self {
            parameters: ReconstructionParameters::default(),
            min_depth_clip: default_min_depth_clip(),
            max_depth_clip: default_max_depth_clip(),
            translate_reset_pose_by_min_depth: true,
            mirror_depth: false,
        }
    }
}

/// Mesh export settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Export folder (created on demand)
    #[serde(default = "default_export_dir")]
    pub directory: PathBuf,

    /// Counter file name inside `directory`
    #[serde(default = "default_counter_file")]
    pub counter_file: String,

    /// Default output format
    #[serde(default)]
    pub format: MeshFormat,

    /// Center Y as well as X and Z
    #[serde(default)]
    pub center_vertical: bool,

    /// Mesh voxel step (1 = full detail)
    #[serde(default = "default_detail_level")]
    pub detail_level: u32,
}

fn default_export_dir() -> PathBuf {
    PathBuf::from("exports")
}

fn default_counter_file() -> String {
    "export_counter.txt".to_string()
}

fn default_detail_level() -> u32 {
    1
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            directory: default_export_dir(),
            counter_file: default_counter_file(),
            format: MeshFormat::default(),
            center_vertical: false,
            detail_level: default_detail_level(),
        }
    }
}

/// Telemetry settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Frame-rate reporting interval (seconds)
    #[serde(default = "default_frame_rate_interval")]
    pub frame_rate_interval_secs: f64,

    /// Status channel capacity
    #[serde(default = "default_status_capacity")]
    pub status_channel_capacity: usize,

    /// Error channel capacity
    #[serde(default = "default_error_capacity")]
    pub error_channel_capacity: usize,
}

fn default_frame_rate_interval() -> f64 {
    1.0
}

fn default_status_capacity() -> usize {
    256
}

fn default_error_capacity() -> usize {
    64
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            frame_rate_interval_secs: default_frame_rate_interval(),
            status_channel_capacity: default_status_capacity(),
            error_channel_capacity: default_error_capacity(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_json() {
        let blueprint: SessionBlueprint = serde_json::from_str("{}").unwrap();
        assert_eq!(blueprint.sensor.kind, SensorKind::Mock);
        assert_eq!(blueprint.reconstruction.parameters.voxels_per_meter, 256);
        assert!(blueprint.reconstruction.translate_reset_pose_by_min_depth);
        assert!(!blueprint.export.center_vertical);
        assert_eq!(blueprint.export.format, MeshFormat::Stl);
    }

    #[test]
    fn test_flattened_parameters() {
        let json = r#"{
            "reconstruction": {
                "voxels_per_meter": 128,
                "resolution_x": 256,
                "resolution_y": 256,
                "resolution_z": 256,
                "min_depth_clip": 0.5
            }
        }"#;
        let blueprint: SessionBlueprint = serde_json::from_str(json).unwrap();
        let conversion = blueprint.reconstruction.depth_conversion();
        assert_eq!(blueprint.reconstruction.parameters.voxels_per_meter, 128);
        assert_eq!(conversion.min_depth_clip, 0.5);
        assert_eq!(conversion.max_depth_clip, 8.0);
    }
}
