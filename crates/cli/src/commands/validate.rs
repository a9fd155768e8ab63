//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{SensorKind, SessionBlueprint};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Volumes above this voxel count often fail engine creation
const LARGE_VOLUME_VOXELS: u64 = 512 * 512 * 512;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    sensor_kind: String,
    voxels_per_meter: u32,
    resolution: [u32; 3],
    voxel_count: u64,
    export_format: String,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint);
            let params = &blueprint.reconstruction.parameters;

            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", blueprint.version),
                    sensor_kind: format!("{:?}", blueprint.sensor.kind),
                    voxels_per_meter: params.voxels_per_meter,
                    resolution: [params.resolution_x, params.resolution_y, params.resolution_z],
                    voxel_count: params.voxel_count(),
                    export_format: blueprint.export.format.to_string(),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(blueprint: &SessionBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();
    let sensor = &blueprint.sensor;
    let recon = &blueprint.reconstruction;

    if sensor.kind == SensorKind::Mock {
        if sensor.replay_path.is_some() {
            warnings.push("sensor.replay_path is ignored for the mock sensor".to_string());
        }
        if sensor.replay_loop {
            warnings.push("sensor.replay_loop has no effect for the mock sensor".to_string());
        }
    }

    let voxels = recon.parameters.voxel_count();
    if voxels > LARGE_VOLUME_VOXELS {
        warnings.push(format!(
            "volume has {voxels} voxels; engine creation may fail, consider a smaller resolution"
        ));
    }

    if recon.min_depth_clip >= recon.max_depth_clip {
        warnings.push(format!(
            "min_depth_clip ({}) is not below max_depth_clip ({}); the reset shift uses the smaller value",
            recon.min_depth_clip, recon.max_depth_clip
        ));
    }

    let volume_depth = recon.parameters.volume_size_meters().z;
    if recon.translate_reset_pose_by_min_depth && volume_depth <= recon.min_depth_clip {
        warnings.push(format!(
            "volume depth {volume_depth:.2} m does not reach past the near clip; shifted volume sees nothing"
        ));
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            let [x, y, z] = summary.resolution;
            println!("\n  Version: {}", summary.version);
            println!("  Sensor: {}", summary.sensor_kind);
            println!("  Voxels per meter: {}", summary.voxels_per_meter);
            println!("  Resolution: {x} x {y} x {z} ({} voxels)", summary.voxel_count);
            println!("  Export format: {}", summary.export_format);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::ReconstructionParameters;
    use std::io::Write;

    #[test]
    fn test_default_blueprint_has_no_warnings() {
        assert!(collect_warnings(&SessionBlueprint::default()).is_empty());
    }

    #[test]
    fn test_warnings() {
        let mut blueprint = SessionBlueprint::default();
        blueprint.sensor.replay_loop = true;
        blueprint.reconstruction.parameters = ReconstructionParameters::new(256, 1024, 1024, 1024);
        blueprint.reconstruction.max_depth_clip = 0.3;

        let warnings = collect_warnings(&blueprint);
        assert_eq!(warnings.len(), 3, "{warnings:?}");
        assert!(warnings[0].contains("replay_loop"));
        assert!(warnings[1].contains("voxels"));
        assert!(warnings[2].contains("min_depth_clip"));
    }

    #[test]
    fn test_validate_missing_file() {
        let args = ValidateArgs {
            config: "does-not-exist.toml".into(),
            json: true,
        };
        let result = validate_config(&args);
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("File not found"));
    }

    #[test]
    fn test_validate_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[reconstruction]\nvoxels_per_meter = 128\nresolution_x = 64\nresolution_y = 64\nresolution_z = 64").unwrap();

        let args = ValidateArgs {
            config: file.path().to_path_buf(),
            json: false,
        };
        let result = validate_config(&args);
        assert!(result.valid, "{:?}", result.error);
        assert_eq!(result.summary.unwrap().voxel_count, 64 * 64 * 64);
    }
}
