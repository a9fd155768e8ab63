//! `info` command implementation.

use anyhow::{Context, Result};
use config_loader::{ConfigFormat, ConfigLoader};
use contracts::SessionBlueprint;
use exporter::MeshExporter;
use serde::Serialize;
use tracing::info;

use super::load_blueprint;
use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct SessionInfo {
    version: String,
    sensor: SensorInfo,
    reconstruction: ReconstructionInfo,
    export: ExportInfo,
}

#[derive(Serialize)]
struct SensorInfo {
    kind: String,
    width: u32,
    height: u32,
    frequency_hz: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    replay_path: Option<String>,
}

#[derive(Serialize)]
struct ReconstructionInfo {
    voxels_per_meter: u32,
    resolution: [u32; 3],
    volume_size_m: [f32; 3],
    min_depth_clip: f32,
    max_depth_clip: f32,
    translate_reset_pose_by_min_depth: bool,
}

#[derive(Serialize)]
struct ExportInfo {
    folder: String,
    format: String,
    center_vertical: bool,
    detail_level: u32,
    next_counter: u64,
    next_file: String,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    let blueprint = load_blueprint(&args.config)?;

    if args.resolved {
        let toml = ConfigLoader::render(&blueprint, ConfigFormat::Toml)
            .context("Failed to render configuration")?;
        println!("{}", toml);
        return Ok(());
    }

    let info = build_session_info(&blueprint)?;

    if args.json {
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize session info")?;
        println!("{}", json);
    } else {
        print_session_info(&info);
    }

    Ok(())
}

fn build_session_info(blueprint: &SessionBlueprint) -> Result<SessionInfo> {
    let sensor = &blueprint.sensor;
    let recon = &blueprint.reconstruction;
    let params = &recon.parameters;
    let size = params.volume_size_meters();

    let exporter = MeshExporter::from_config(&blueprint.export);
    let counter = exporter.counter();
    let next_counter = counter
        .peek()
        .with_context(|| format!("Failed to read export counter in {}", counter.directory().display()))?;
    let next_file = counter.peek_path(exporter.default_format())?;

    Ok(SessionInfo {
        version: format!("{:?}", blueprint.version),
        sensor: SensorInfo {
            kind: format!("{:?}", sensor.kind),
            width: sensor.width,
            height: sensor.height,
            frequency_hz: sensor.frequency_hz,
            replay_path: sensor.replay_path.as_ref().map(|p| p.display().to_string()),
        },
        reconstruction: ReconstructionInfo {
            voxels_per_meter: params.voxels_per_meter,
            resolution: [params.resolution_x, params.resolution_y, params.resolution_z],
            volume_size_m: [size.x, size.y, size.z],
            min_depth_clip: recon.min_depth_clip,
            max_depth_clip: recon.max_depth_clip,
            translate_reset_pose_by_min_depth: recon.translate_reset_pose_by_min_depth,
        },
        export: ExportInfo {
            folder: counter.directory().display().to_string(),
            format: exporter.default_format().to_string(),
            center_vertical: blueprint.export.center_vertical,
            detail_level: blueprint.export.detail_level,
            next_counter,
            next_file: next_file.display().to_string(),
        },
    })
}

fn print_session_info(info: &SessionInfo) {
    println!("=== Depth Fusion Session ===\n");

    let sensor = &info.sensor;
    println!("Sensor");
    println!("   ├─ Version: {}", info.version);
    println!("   ├─ Kind: {}", sensor.kind);
    if let Some(path) = &sensor.replay_path {
        println!("   ├─ Recording: {}", path);
    }
    println!(
        "   └─ Frames: {}x{} @ {} Hz",
        sensor.width, sensor.height, sensor.frequency_hz
    );

    let recon = &info.reconstruction;
    let [rx, ry, rz] = recon.resolution;
    let [sx, sy, sz] = recon.volume_size_m;
    println!("\nReconstruction");
    println!("   ├─ Voxels per meter: {}", recon.voxels_per_meter);
    println!("   ├─ Resolution: {rx} x {ry} x {rz}");
    println!("   ├─ Volume size: {sx:.2} x {sy:.2} x {sz:.2} m");
    println!(
        "   ├─ Depth clip: {:.2} .. {:.2} m",
        recon.min_depth_clip, recon.max_depth_clip
    );
    println!(
        "   └─ Shift reset pose by near clip: {}",
        recon.translate_reset_pose_by_min_depth
    );

    let export = &info.export;
    println!("\nExport");
    println!("   ├─ Folder: {}", export.folder);
    println!("   ├─ Format: {}", export.format);
    println!("   ├─ Center vertical: {}", export.center_vertical);
    println!("   ├─ Detail level: {}", export.detail_level);
    println!("   └─ Next file: {}", export.next_file);

    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::MeshFormat;

    #[test]
    fn test_info_reports_volume_and_next_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut blueprint = SessionBlueprint::default();
        blueprint.export.directory = dir.path().join("exports");
        blueprint.export.format = MeshFormat::Ply;
        std::fs::create_dir_all(&blueprint.export.directory).unwrap();
        std::fs::write(blueprint.export.directory.join("export_counter.txt"), "7").unwrap();

        let info = build_session_info(&blueprint).unwrap();

        assert_eq!(info.reconstruction.volume_size_m, [2.0, 1.5, 2.0]);
        assert_eq!(info.export.next_counter, 7);
        assert!(info.export.next_file.ends_with("mesh_0007.ply"), "{}", info.export.next_file);
    }

    #[test]
    fn test_info_without_export_folder() {
        let dir = tempfile::tempdir().unwrap();
        let mut blueprint = SessionBlueprint::default();
        blueprint.export.directory = dir.path().join("missing");

        let info = build_session_info(&blueprint).unwrap();
        assert_eq!(info.export.next_counter, 0);
        assert!(!dir.path().join("missing").exists());
    }
}
