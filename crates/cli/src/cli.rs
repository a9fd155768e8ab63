//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use contracts::MeshFormat;
use std::path::PathBuf;

/// Depth Fusion - live volumetric reconstruction from a depth stream
#[derive(Parser, Debug)]
#[command(
    name = "depth-fusion",
    author,
    version,
    about = "Depth-stream volumetric reconstruction session",
    long_about = "Streams depth frames from a sensor or a recording into a volumetric \n\
                  fusion engine, one step at a time, and exports the reconstructed \n\
                  surface as OBJ, PLY or binary STL."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "DEPTH_FUSION_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "DEPTH_FUSION_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a reconstruction session
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display session parameters and export location
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "config.toml",
        env = "DEPTH_FUSION_CONFIG"
    )]
    pub config: PathBuf,

    /// Stop after this many processed frames (0 = unlimited)
    #[arg(long, default_value = "0", env = "DEPTH_FUSION_MAX_FRAMES")]
    pub max_frames: u64,

    /// Session duration in seconds (0 = until the source ends or Ctrl+C)
    #[arg(long, default_value = "0", env = "DEPTH_FUSION_DURATION")]
    pub duration: u64,

    /// Export the mesh when the session ends
    #[arg(long)]
    pub export: bool,

    /// Explicit export path; the extension selects the format
    #[arg(short, long, env = "DEPTH_FUSION_OUTPUT")]
    pub output: Option<PathBuf>,

    /// Override the export format from configuration
    #[arg(long, value_enum, env = "DEPTH_FUSION_FORMAT")]
    pub format: Option<FormatArg>,

    /// Override voxel density from configuration
    #[arg(long, env = "DEPTH_FUSION_VOXELS_PER_METER")]
    pub voxels_per_meter: Option<u32>,

    /// Override volume resolution: `N` for a cube or `XxYxZ`
    #[arg(long, value_parser = parse_resolution, env = "DEPTH_FUSION_RESOLUTION")]
    pub resolution: Option<[u32; 3]>,

    /// Validate configuration and exit without running the session
    #[arg(long)]
    pub dry_run: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "DEPTH_FUSION_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Print the effective configuration, defaults filled in
    #[arg(long, conflicts_with = "json")]
    pub resolved: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

/// Mesh export format
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormatArg {
    Obj,
    Ply,
    Stl,
}

impl From<FormatArg> for MeshFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Obj => MeshFormat::Obj,
            FormatArg::Ply => MeshFormat::Ply,
            FormatArg::Stl => MeshFormat::Stl,
        }
    }
}

fn parse_resolution(value: &str) -> Result<[u32; 3], String> {
    let parts = value
        .split(['x', 'X'])
        .map(|p| p.trim().parse::<u32>().map_err(|e| format!("'{p}': {e}")))
        .collect::<Result<Vec<_>, _>>()?;

    match parts.as_slice() {
        [n] => Ok([*n; 3]),
        [x, y, z] => Ok([*x, *y, *z]),
        _ => Err(format!("expected N or XxYxZ, got '{value}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_resolution() {
        assert_eq!(parse_resolution("256").unwrap(), [256; 3]);
        assert_eq!(parse_resolution("512x384X512").unwrap(), [512, 384, 512]);
        assert!(parse_resolution("512x384").is_err());
        assert!(parse_resolution("abc").is_err());
    }

    #[test]
    fn test_run_args() {
        let cli = Cli::try_parse_from([
            "depth-fusion",
            "run",
            "-c",
            "session.toml",
            "--max-frames",
            "30",
            "--export",
            "--format",
            "ply",
            "--resolution",
            "128",
        ])
        .unwrap();

        let Commands::Run(args) = cli.command else {
            panic!("expected run command");
        };
        assert_eq!(args.config, PathBuf::from("session.toml"));
        assert_eq!(args.max_frames, 30);
        assert!(args.export);
        assert_eq!(args.format.map(MeshFormat::from), Some(MeshFormat::Ply));
        assert_eq!(args.resolution, Some([128; 3]));
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        let result = Cli::try_parse_from(["depth-fusion", "-v", "-q", "info"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
