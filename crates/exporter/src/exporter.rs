//! Mesh exporter

use std::fs;
use std::path::PathBuf;

use contracts::{ExportConfig, MeshFormat, MeshSnapshot};
use serde::Serialize;
use tracing::{info, instrument};

use crate::error::Result;
use crate::formats;
use crate::naming::{ExportCounter, ExportDestination};
use crate::normalize::{normalize, CenteringMode};

/// What an export wrote
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportReport {
    pub path: PathBuf,
    pub format: MeshFormat,
    pub triangles: usize,
    pub bytes_written: u64,
}

/// Serializes mesh snapshots to disk
#[derive(Debug)]
pub struct MeshExporter {
    counter: ExportCounter,
    centering: CenteringMode,
    default_format: MeshFormat,
}

impl MeshExporter {
    pub fn new(counter: ExportCounter, centering: CenteringMode, default_format: MeshFormat) -> Self {
        Self {
            counter,
            centering,
            default_format,
        }
    }

    pub fn from_config(config: &ExportConfig) -> Self {
        Self::new(
            ExportCounter::new(&config.directory, &config.counter_file),
            CenteringMode::from_center_vertical(config.center_vertical),
            config.format,
        )
    }

    pub fn counter(&self) -> &ExportCounter {
        &self.counter
    }

    pub fn default_format(&self) -> MeshFormat {
        self.default_format
    }

    /// Counter destination in the configured format
    pub fn default_destination(&self) -> ExportDestination {
        ExportDestination::Counter(self.default_format)
    }

    /// Write `mesh` to `destination`
    ///
    /// A missing mesh or destination is a no-op and returns `None`. The mesh
    /// is validated and fully encoded before the file is created, so a
    /// rejected mesh never leaves a partial file or consumes a counter value.
    ///
    /// # Errors
    /// - `InvalidMesh` for a snapshot that fails validation
    /// - `UnrecognizedExportFormat` for an explicit path with an unknown extension
    /// - IO errors from the counter file or the output file
    #[instrument(name = "mesh_export", skip_all)]
    pub fn export(
        &self,
        mesh: Option<&MeshSnapshot>,
        destination: Option<&ExportDestination>,
    ) -> Result<Option<ExportReport>> {
        let (Some(mesh), Some(destination)) = (mesh, destination) else {
            return Ok(None);
        };

        let format = destination.format()?;
        let normalized = normalize(mesh, self.centering)?;
        let encoded = formats::encode(format, &normalized)?;

        let path = match destination {
            ExportDestination::Counter(_) => self.counter.next_path(format)?,
            ExportDestination::Path(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    fs::create_dir_all(parent)?;
                }
                path.clone()
            }
        };
        fs::write(&path, &encoded)?;

        let report = ExportReport {
            path,
            format,
            triangles: normalized.triangle_count(),
            bytes_written: encoded.len() as u64,
        };
        info!(
            path = %report.path.display(),
            format = %format,
            triangles = report.triangles,
            bytes = report.bytes_written,
            "mesh exported"
        );
        Ok(Some(report))
    }
}
