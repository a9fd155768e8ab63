//! # Exporter
//!
//! Mesh export pipeline.
//!
//! Responsibilities:
//! - Validate a mesh snapshot before anything touches the disk
//! - Centre it and convert it to output axes
//! - Serialize to OBJ, PLY or binary STL
//! - Name outputs from a persisted counter or an explicit path
//! - Run exports on a background worker, off the frame pipeline

pub mod error;
pub mod exporter;
pub mod formats;
pub mod handle;
pub mod metrics;
pub mod naming;
pub mod normalize;

pub use contracts::{MeshFormat, MeshSnapshot};
pub use error::{ExportError, Result};
pub use exporter::{ExportReport, MeshExporter};
pub use handle::{ExportHandle, ExportRequest};
pub use metrics::{ExportMetrics, ExportMetricsSnapshot};
pub use naming::{ExportCounter, ExportDestination};
pub use normalize::{normalize, CenteringMode, NormalizedMesh};
