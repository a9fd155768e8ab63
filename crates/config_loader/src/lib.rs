//! # Config Loader
//!
//! Reads a session configuration file into a [`SessionBlueprint`].
//!
//! Responsibilities:
//! - Parse TOML (primary) or JSON, chosen by file extension
//! - Fill every omitted field with its default
//! - Reject values the session cannot run with
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let blueprint = ConfigLoader::load_from_path(Path::new("session.toml")).unwrap();
//! println!("voxels/m: {}", blueprint.reconstruction.parameters.voxels_per_meter);
//! ```

mod parser;
mod validator;

pub use contracts::SessionBlueprint;
pub use parser::ConfigFormat;

use contracts::ContractError;
use std::path::Path;

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load and validate a configuration file
    ///
    /// # Errors
    /// - Extension other than `.toml` / `.json`
    /// - File read failure
    /// - Parse or validation failure
    pub fn load_from_path(path: &Path) -> Result<SessionBlueprint, ContractError> {
        let format = ConfigFormat::from_path(path).ok_or_else(|| {
            ContractError::config_parse(format!(
                "unsupported config file '{}': expected .toml or .json",
                path.display()
            ))
        })?;
        let content = std::fs::read_to_string(path)?;
        Self::load_from_str(&content, format)
    }

    /// Load and validate configuration text
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<SessionBlueprint, ContractError> {
        let blueprint = parser::parse(content, format)?;
        validator::validate(&blueprint)?;
        Ok(blueprint)
    }

    /// Re-check a blueprint after it was edited in memory (e.g. CLI overrides)
    pub fn validate(blueprint: &SessionBlueprint) -> Result<(), ContractError> {
        validator::validate(blueprint)
    }

    /// Serialize the effective configuration
    pub fn render(
        blueprint: &SessionBlueprint,
        format: ConfigFormat,
    ) -> Result<String, ContractError> {
        parser::render(blueprint, format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::MeshFormat;

    const MINIMAL_TOML: &str = r#"
[sensor]
kind = "mock"
width = 320
height = 240
frequency_hz = 30.0

[reconstruction]
voxels_per_meter = 256
resolution_x = 384
resolution_y = 384
resolution_z = 384
min_depth_clip = 0.35
max_depth_clip = 4.0
translate_reset_pose_by_min_depth = true

[export]
directory = "exports"
format = "stl"

[telemetry]
frame_rate_interval_secs = 1.0
"#;

    #[test]
    fn test_load_from_str_toml() {
        let bp = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml).unwrap();
        assert_eq!(bp.reconstruction.parameters.resolution_x, 384);
        assert_eq!(bp.reconstruction.max_depth_clip, 4.0);
        assert_eq!(bp.export.counter_file, "export_counter.txt");
    }

    #[test]
    fn test_rendered_config_loads_back() {
        let bp = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml).unwrap();

        let toml = ConfigLoader::render(&bp, ConfigFormat::Toml).unwrap();
        assert!(toml.contains("center_vertical = false"), "{toml}");
        let from_toml = ConfigLoader::load_from_str(&toml, ConfigFormat::Toml).unwrap();
        assert_eq!(bp.reconstruction.parameters, from_toml.reconstruction.parameters);

        let json = ConfigLoader::render(&bp, ConfigFormat::Json).unwrap();
        let from_json = ConfigLoader::load_from_str(&json, ConfigFormat::Json).unwrap();
        assert_eq!(from_json.export.format, MeshFormat::Stl);
        assert_eq!(bp.sensor.width, from_json.sensor.width);
    }

    #[test]
    fn test_load_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, r#"{ "export": { "format": "obj", "detail_level": 2 } }"#).unwrap();

        let bp = ConfigLoader::load_from_path(&path).unwrap();
        assert_eq!(bp.export.format, MeshFormat::Obj);
        assert_eq!(bp.export.detail_level, 2);
    }

    #[test]
    fn test_validation_runs_after_parse() {
        let content = r#"
[reconstruction]
voxels_per_meter = 0
resolution_x = 384
resolution_y = 384
resolution_z = 384
"#;
        let err = ConfigLoader::load_from_str(content, ConfigFormat::Toml).unwrap_err();
        assert!(err.to_string().contains("voxel density"), "got: {err}");
    }

    #[test]
    fn test_non_finite_literals_rejected() {
        for content in [
            "[telemetry]\nframe_rate_interval_secs = nan\n",
            "[telemetry]\nframe_rate_interval_secs = 1e-12\n",
            "[sensor]\nfrequency_hz = nan\n",
            "[sensor]\nfrequency_hz = inf\n",
            "[reconstruction]\nvoxels_per_meter = 256\nresolution_x = 64\nresolution_y = 64\nresolution_z = 64\nmax_depth_clip = inf\n",
        ] {
            let result = ConfigLoader::load_from_str(content, ConfigFormat::Toml);
            assert!(
                matches!(result, Err(ContractError::ConfigValidation { .. })),
                "accepted: {content}"
            );
        }
    }

    #[test]
    fn test_unsupported_extension() {
        let result = ConfigLoader::load_from_path(Path::new("session.yaml"));
        assert!(matches!(result, Err(ContractError::ConfigParse { .. })));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = ConfigLoader::load_from_path(Path::new("no/such/session.toml")).unwrap_err();
        assert!(!matches!(err, ContractError::ConfigParse { .. }));
    }
}
