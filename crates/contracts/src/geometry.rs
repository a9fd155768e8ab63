//! Pose, volume transform and reconstruction parameters

use nalgebra::{Matrix4, Vector3};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Camera-to-world rigid transform
///
/// Never absent: a fresh session starts at identity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose(pub Matrix4<f32>);

impl Pose {
    /// Identity pose
    pub fn identity() -> Self {
        Self(Matrix4::identity())
    }

    /// Pure translation pose
    pub fn from_translation(translation: Vector3<f32>) -> Self {
        Self(Matrix4::new_translation(&translation))
    }

    /// Translation component
    pub fn translation(&self) -> Vector3<f32> {
        Vector3::new(self.0[(0, 3)], self.0[(1, 3)], self.0[(2, 3)])
    }

    /// Exact identity check
    pub fn is_identity(&self) -> bool {
        self.0 == Matrix4::identity()
    }

    /// Underlying matrix
    pub fn matrix(&self) -> &Matrix4<f32> {
        &self.0
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}

/// World-to-volume transform
///
/// Maps world metres into voxel coordinates. The engine supplies a default at
/// creation; derived transforms are always built from that default.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumeTransform(pub Matrix4<f32>);

impl VolumeTransform {
    /// Translation along the sensor view axis (Z), in voxels
    pub fn view_axis_translation(&self) -> f32 {
        self.0[(2, 3)]
    }

    /// Copy of this transform with the view-axis translation decreased by `voxels`
    pub fn shifted_along_view_axis(&self, voxels: f32) -> Self {
        let mut shifted = self.0;
        shifted[(2, 3)] -= voxels;
        Self(shifted)
    }

    /// Underlying matrix
    pub fn matrix(&self) -> &Matrix4<f32> {
        &self.0
    }
}

impl Default for VolumeTransform {
    fn default() -> Self {
        Self(Matrix4::identity())
    }
}

/// Reconstruction volume parameters
///
/// Fixed for the lifetime of one engine instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct ReconstructionParameters {
    /// Voxel density (voxels per metre)
    #[validate(range(min = 1))]
    pub voxels_per_meter: u32,

    /// Volume resolution along X (voxels)
    #[validate(range(min = 1))]
    pub resolution_x: u32,

    /// Volume resolution along Y (voxels)
    #[validate(range(min = 1))]
    pub resolution_y: u32,

    /// Volume resolution along Z (voxels)
    #[validate(range(min = 1))]
    pub resolution_z: u32,
}

impl ReconstructionParameters {
    /// Create parameters
    pub fn new(voxels_per_meter: u32, resolution_x: u32, resolution_y: u32, resolution_z: u32) -> Self {
        Self {
            voxels_per_meter,
            resolution_x,
            resolution_y,
            resolution_z,
        }
    }

    /// Total voxel count
    pub fn voxel_count(&self) -> u64 {
        self.resolution_x as u64 * self.resolution_y as u64 * self.resolution_z as u64
    }

    /// Physical volume extents in metres
    pub fn volume_size_meters(&self) -> Vector3<f32> {
        let vpm = self.voxels_per_meter as f32;
        Vector3::new(
            self.resolution_x as f32 / vpm,
            self.resolution_y as f32 / vpm,
            self.resolution_z as f32 / vpm,
        )
    }
}

impl Default for ReconstructionParameters {
    fn default() -> Self {
        Self::new(256, 512, 384, 512)
    }
}
