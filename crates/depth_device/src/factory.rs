//! Depth source construction from session settings

use contracts::{DepthSource, SensorConfig, SensorKind};
use tracing::{info, instrument};

use crate::error::{DeviceError, Result};
use crate::mock_sensor::{MockDepthSensor, MockDepthSensorConfig};
use crate::replay_sensor::{ReplayConfig, ReplayDepthSensor};

/// Builds the configured [`DepthSource`]
pub struct DepthSourceFactory;

impl DepthSourceFactory {
    /// Create a depth source from `[sensor]` settings
    ///
    /// # Errors
    /// Replay mode without `replay_path`, or a recording that fails to load.
    #[instrument(name = "depth_source_from_config", skip(config), fields(kind = ?config.kind))]
    pub fn from_config(config: &SensorConfig) -> Result<Box<dyn DepthSource>> {
        let source: Box<dyn DepthSource> = match config.kind {
            SensorKind::Mock => Box::new(MockDepthSensor::new(
                "mock-depth",
                MockDepthSensorConfig::from_sensor_config(config),
            )),
            SensorKind::Replay => {
                let path = config.replay_path.as_deref().ok_or_else(|| {
                    DeviceError::recording_not_found("<unset>", "sensor.replay_path is required for replay")
                })?;
                Box::new(ReplayDepthSensor::load(
                    path,
                    ReplayConfig {
                        speed_multiplier: config.replay_speed,
                        loop_playback: config.replay_loop,
                    },
                )?)
            }
        };

        info!(source = source.name(), "depth source ready");
        Ok(source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_from_config() {
        let config = SensorConfig {
            width: 8,
            height: 6,
            ..Default::default()
        };
        let source = DepthSourceFactory::from_config(&config).unwrap();
        assert_eq!(source.frame_data_length(), 48);
        assert!(source.sensor_connected());
        assert!(!source.is_streaming());
    }

    #[test]
    fn test_replay_requires_path() {
        let config = SensorConfig {
            kind: SensorKind::Replay,
            ..Default::default()
        };
        assert!(matches!(
            DepthSourceFactory::from_config(&config),
            Err(DeviceError::RecordingNotFound { .. })
        ));
    }
}
