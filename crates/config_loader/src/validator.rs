//! Configuration validation
//!
//! Rules:
//! - voxel density and volume resolution > 0
//! - max_depth_clip > 0, min_depth_clip >= 0
//! - sensor size and frequency > 0, replay sensors name a recording
//! - export detail_level >= 1, export directory not empty
//! - telemetry interval >= 1 ms, channel capacities > 0
//!
//! Float fields must also be finite; TOML accepts `nan` and `inf`.

use std::time::Duration;

use contracts::{ContractError, SensorKind, SessionBlueprint};
use validator::Validate;

/// Shortest frame-rate reporting interval
pub const MIN_FRAME_RATE_INTERVAL_SECS: f64 = 0.001;

fn require_positive(field: &str, value: f64) -> Result<(), ContractError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ContractError::config_validation(
            field,
            format!("{field} must be finite and > 0, got {value}"),
        ))
    }
}

/// Validate a SessionBlueprint
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(blueprint: &SessionBlueprint) -> Result<(), ContractError> {
    validate_sensor(blueprint)?;
    validate_reconstruction(blueprint)?;
    validate_export(blueprint)?;
    validate_telemetry(blueprint)?;
    Ok(())
}

/// Validate depth source settings
fn validate_sensor(blueprint: &SessionBlueprint) -> Result<(), ContractError> {
    let sensor = &blueprint.sensor;

    if sensor.width == 0 || sensor.height == 0 {
        return Err(ContractError::config_validation(
            "sensor.width / sensor.height",
            format!(
                "depth image size must be > 0, got {}x{}",
                sensor.width, sensor.height
            ),
        ));
    }

    require_positive("sensor.frequency_hz", sensor.frequency_hz)?;
    if Duration::try_from_secs_f64(1.0 / sensor.frequency_hz).is_err() {
        return Err(ContractError::config_validation(
            "sensor.frequency_hz",
            format!("frequency_hz {} gives no usable frame period", sensor.frequency_hz),
        ));
    }

    if sensor.kind == SensorKind::Replay {
        if sensor.replay_path.is_none() {
            return Err(ContractError::config_validation(
                "sensor.replay_path",
                "replay sensor requires replay_path",
            ));
        }
        require_positive("sensor.replay_speed", sensor.replay_speed)?;
    }

    Ok(())
}

/// Validate reconstruction volume settings
fn validate_reconstruction(blueprint: &SessionBlueprint) -> Result<(), ContractError> {
    let recon = &blueprint.reconstruction;

    recon.parameters.validate().map_err(|e| {
        ContractError::config_validation(
            "reconstruction",
            format!("voxel density and resolution must be > 0: {e}"),
        )
    })?;

    if !(recon.min_depth_clip.is_finite() && recon.min_depth_clip >= 0.0) {
        return Err(ContractError::config_validation(
            "reconstruction.min_depth_clip",
            format!("min_depth_clip must be finite and >= 0, got {}", recon.min_depth_clip),
        ));
    }

    require_positive("reconstruction.max_depth_clip", recon.max_depth_clip.into())?;

    Ok(())
}

/// Validate export settings
fn validate_export(blueprint: &SessionBlueprint) -> Result<(), ContractError> {
    let export = &blueprint.export;

    if export.directory.as_os_str().is_empty() {
        return Err(ContractError::config_validation(
            "export.directory",
            "export directory cannot be empty",
        ));
    }

    if export.counter_file.is_empty() {
        return Err(ContractError::config_validation(
            "export.counter_file",
            "counter file name cannot be empty",
        ));
    }

    if export.detail_level == 0 {
        return Err(ContractError::config_validation(
            "export.detail_level",
            "detail_level must be >= 1",
        ));
    }

    Ok(())
}

/// Validate telemetry settings
fn validate_telemetry(blueprint: &SessionBlueprint) -> Result<(), ContractError> {
    let telemetry = &blueprint.telemetry;

    let interval = telemetry.frame_rate_interval_secs;
    if !(interval.is_finite() && interval >= MIN_FRAME_RATE_INTERVAL_SECS) {
        return Err(ContractError::config_validation(
            "telemetry.frame_rate_interval_secs",
            format!(
                "frame_rate_interval_secs must be finite and >= {MIN_FRAME_RATE_INTERVAL_SECS}, got {interval}"
            ),
        ));
    }

    if telemetry.status_channel_capacity == 0 || telemetry.error_channel_capacity == 0 {
        return Err(ContractError::config_validation(
            "telemetry",
            "channel capacities must be > 0",
        ));
    }

    Ok(())
}
