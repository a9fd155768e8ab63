//! Reconstruction engine contract
//!
//! The volumetric fusion numerics (pose tracking, TSDF integration, ray
//! casting) live behind these traits. The workspace only drives the engine.

use bytes::Bytes;
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

use crate::{ContractError, DepthFrame, FloatFrame, MeshSnapshot, Pose, ReconstructionParameters, VolumeTransform};

/// Depth-to-float conversion settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DepthConversion {
    /// Near clip (metres)
    pub min_depth_clip: f32,

    /// Far clip (metres)
    pub max_depth_clip: f32,

    /// Flip every row horizontally
    pub mirror: bool,
}

impl Default for DepthConversion {
    fn default() -> Self {
        Self {
            min_depth_clip: 0.35,
            max_depth_clip: 8.0,
            mirror: false,
        }
    }
}

/// Result of one combined track-and-integrate step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackingOutcome {
    /// Whether the frame aligned against the volume
    pub tracking_succeeded: bool,

    /// Engine-reported pose (meaningful only on success)
    pub pose: Pose,
}

/// Ray-cast surface samples
#[derive(Debug, Clone, Default)]
pub struct PointCloud {
    pub width: u32,
    pub height: u32,
    pub points: Vec<Point3<f32>>,
    pub normals: Vec<Vector3<f32>>,
}

/// Shaded BGRA8 image of the reconstruction
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColorBuffer {
    pub width: u32,
    pub height: u32,
    pub data: Bytes,
}

/// Volumetric fusion engine instance
///
/// One instance owns one voxel grid. Instances are created by an
/// [`EngineFactory`] and must be disposed exactly once.
pub trait ReconstructionEngine: Send {
    /// World-to-volume transform chosen by the engine at creation
    fn default_world_to_volume_transform(&self) -> VolumeTransform;

    /// Convert raw millimetre depth to clipped metres
    fn depth_to_float(
        &self,
        frame: &DepthFrame,
        conversion: &DepthConversion,
    ) -> Result<FloatFrame, ContractError>;

    /// Track the frame against the volume and integrate it on success
    fn process_frame(
        &mut self,
        frame: &FloatFrame,
        pose: &Pose,
    ) -> Result<TrackingOutcome, ContractError>;

    /// Ray-cast the volume from `pose`
    fn compute_point_cloud(&self, pose: &Pose) -> Result<PointCloud, ContractError>;

    /// Shade a point cloud into a displayable image
    fn shade(&self, cloud: &PointCloud) -> Result<ColorBuffer, ContractError>;

    /// Clear the volume; `transform` replaces the world-to-volume transform when given
    fn reset(&mut self, pose: &Pose, transform: Option<&VolumeTransform>) -> Result<(), ContractError>;

    /// Extract the surface mesh, sampling every `detail_level` voxels
    fn calculate_mesh(&self, detail_level: u32) -> Result<MeshSnapshot, ContractError>;

    /// Release compute resources
    fn dispose(&mut self);
}

/// Creates engine instances
pub trait EngineFactory: Send + Sync {
    /// Create an engine for `params`
    ///
    /// # Errors
    /// - `NoCompatibleDevice` when no compute device can host the engine
    /// - `CreationFailed` for any other creation failure
    fn create(
        &self,
        params: &ReconstructionParameters,
        transform: Option<&VolumeTransform>,
    ) -> Result<Box<dyn ReconstructionEngine>, ContractError>;
}

/// Source of mesh snapshots for the exporter
pub trait MeshProvider: Send + Sync {
    /// Take a mesh snapshot at the given detail level
    fn snapshot_mesh(&self, detail_level: u32) -> Result<MeshSnapshot, ContractError>;
}
