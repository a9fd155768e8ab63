//! `run` command implementation.

use anyhow::Result;
use contracts::{MeshFormat, SessionBlueprint};
use exporter::ExportDestination;
use std::time::Duration;
use tracing::{info, warn};

use super::load_blueprint;
use crate::cli::RunArgs;
use crate::error::CliError;
use crate::session::{Session, SessionConfig};

/// Execute the `run` command
pub async fn run_session(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    let mut blueprint = load_blueprint(&args.config)?;
    apply_overrides(&mut blueprint, args)?;

    let params = &blueprint.reconstruction.parameters;
    info!(
        sensor = ?blueprint.sensor.kind,
        voxels_per_meter = params.voxels_per_meter,
        resolution = ?[params.resolution_x, params.resolution_y, params.resolution_z],
        export_dir = %blueprint.export.directory.display(),
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&blueprint);
        return Ok(());
    }

    let session_config = SessionConfig {
        export: export_destination(args, blueprint.export.format),
        blueprint,
        max_frames: (args.max_frames > 0).then_some(args.max_frames),
        duration: (args.duration > 0).then(|| Duration::from_secs(args.duration)),
        metrics_port: (args.metrics_port > 0).then_some(args.metrics_port),
    };

    info!("Starting session...");
    let stats = Session::new(session_config)
        .run(shutdown_signal())
        .await?;

    info!(
        frames_processed = stats.scheduler.frames_processed,
        frames_dropped = stats.scheduler.frames_dropped,
        duration_secs = stats.duration.as_secs_f64(),
        fps = format!("{:.2}", stats.fps()),
        "Session completed"
    );
    stats.print_summary();

    if let Some(error) = stats.export_error {
        return Err(CliError::session(format!("export failed: {error}")).into());
    }

    info!("Depth Fusion finished");
    Ok(())
}

/// Apply command-line overrides, then re-validate
fn apply_overrides(blueprint: &mut SessionBlueprint, args: &RunArgs) -> Result<()> {
    if let Some(vpm) = args.voxels_per_meter {
        info!(voxels_per_meter = vpm, "Overriding voxel density from CLI");
        blueprint.reconstruction.parameters.voxels_per_meter = vpm;
    }
    if let Some([x, y, z]) = args.resolution {
        info!(x, y, z, "Overriding volume resolution from CLI");
        let params = &mut blueprint.reconstruction.parameters;
        params.resolution_x = x;
        params.resolution_y = y;
        params.resolution_z = z;
    }
    if let Some(format) = args.format {
        blueprint.export.format = format.into();
    }

    config_loader::ConfigLoader::validate(blueprint)
        .map_err(|e| CliError::config_validation(e.to_string()))?;
    Ok(())
}

/// Where the end-of-session export goes, if one was asked for
///
/// `--output` implies `--export`; its extension selects the format.
fn export_destination(args: &RunArgs, format: MeshFormat) -> Option<ExportDestination> {
    match (&args.output, args.export) {
        (Some(path), _) => {
            if args.format.is_some() {
                warn!("--format is ignored when --output is given; the extension selects the format");
            }
            Some(ExportDestination::Path(path.clone()))
        }
        (None, true) => Some(ExportDestination::Counter(format)),
        (None, false) => None,
    }
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    warn!("Received shutdown signal, stopping session...");
}

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &SessionBlueprint) {
    let sensor = &blueprint.sensor;
    let recon = &blueprint.reconstruction;
    let params = &recon.parameters;
    let size = params.volume_size_meters();

    println!("\n=== Configuration Summary ===\n");
    println!("Sensor:");
    println!("  Kind: {:?}", sensor.kind);
    println!(
        "  Frames: {}x{} @ {} Hz",
        sensor.width, sensor.height, sensor.frequency_hz
    );
    if let Some(path) = &sensor.replay_path {
        println!("  Recording: {}", path.display());
    }

    println!("\nReconstruction:");
    println!("  Voxels per meter: {}", params.voxels_per_meter);
    println!(
        "  Resolution: {} x {} x {}",
        params.resolution_x, params.resolution_y, params.resolution_z
    );
    println!("  Volume: {:.2} x {:.2} x {:.2} m", size.x, size.y, size.z);
    println!(
        "  Depth clip: {:.2} .. {:.2} m",
        recon.min_depth_clip, recon.max_depth_clip
    );
    println!(
        "  Shift reset pose by near clip: {}",
        recon.translate_reset_pose_by_min_depth
    );

    println!("\nExport:");
    println!("  Folder: {}", blueprint.export.directory.display());
    println!("  Format: {}", blueprint.export.format);
    println!("  Center vertical: {}", blueprint.export.center_vertical);

    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::FormatArg;
    use clap::Parser;
    use std::path::PathBuf;

    fn args(extra: &[&str]) -> RunArgs {
        let mut argv = vec!["run"];
        argv.extend_from_slice(extra);
        RunArgs::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_no_export_by_default() {
        assert_eq!(export_destination(&args(&[]), MeshFormat::Stl), None);
    }

    #[test]
    fn test_export_uses_counter() {
        let dest = export_destination(&args(&["--export"]), MeshFormat::Ply);
        assert_eq!(dest, Some(ExportDestination::Counter(MeshFormat::Ply)));
    }

    #[test]
    fn test_output_implies_export() {
        let dest = export_destination(&args(&["-o", "scan.obj"]), MeshFormat::Stl);
        assert_eq!(dest, Some(ExportDestination::Path(PathBuf::from("scan.obj"))));
    }

    #[test]
    fn test_overrides_are_validated() {
        let mut blueprint = SessionBlueprint::default();
        let run = args(&["--resolution", "64x32x16", "--format", "obj"]);
        apply_overrides(&mut blueprint, &run).unwrap();
        assert_eq!(blueprint.reconstruction.parameters.resolution_y, 32);
        assert_eq!(blueprint.export.format, MeshFormat::from(FormatArg::Obj));

        let bad = args(&["--voxels-per-meter", "0"]);
        let err = apply_overrides(&mut blueprint, &bad).unwrap_err();
        assert!(err.to_string().contains("validation"), "got: {err}");
    }
}
