//! World-to-volume transform policy

use contracts::{ReconstructionParameters, VolumeTransform};

/// Decides which transform a reset hands to the engine
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformPolicy {
    /// Move the volume away from the sensor by the near clip
    pub shift_by_min_depth: bool,
    pub min_depth_clip: f32,
    pub max_depth_clip: f32,
}

impl TransformPolicy {
    /// View-axis shift in voxels for the given volume density
    pub fn shift_voxels(&self, parameters: &ReconstructionParameters) -> f32 {
        self.min_depth_clip.min(self.max_depth_clip) * parameters.voxels_per_meter as f32
    }

    /// Transform to reset with, derived from the engine default
    ///
    /// `None` means reset without a transform so the engine keeps its default.
    pub fn reset_transform(
        &self,
        default: &VolumeTransform,
        parameters: &ReconstructionParameters,
    ) -> Option<VolumeTransform> {
        self.shift_by_min_depth
            .then(|| default.shifted_along_view_axis(self.shift_voxels(parameters)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(shift: bool) -> TransformPolicy {
        TransformPolicy {
            shift_by_min_depth: shift,
            min_depth_clip: 0.35,
            max_depth_clip: 8.0,
        }
    }

    #[test]
    fn test_shift_uses_smaller_clip() {
        let params = ReconstructionParameters::new(256, 512, 384, 512);
        let swapped = TransformPolicy {
            min_depth_clip: 8.0,
            max_depth_clip: 0.35,
            ..policy(true)
        };
        assert!((policy(true).shift_voxels(&params) - 89.6).abs() < 1e-3);
        assert!((swapped.shift_voxels(&params) - 89.6).abs() < 1e-3);
    }

    #[test]
    fn test_reset_transform_follows_flag() {
        let params = ReconstructionParameters::new(100, 64, 64, 64);
        let default = VolumeTransform::default();

        assert!(policy(false).reset_transform(&default, &params).is_none());

        let shifted = policy(true).reset_transform(&default, &params).unwrap();
        assert!((shifted.view_axis_translation() - (-35.0)).abs() < 1e-4);
    }

    #[test]
    fn test_rederived_from_default_after_density_change() {
        let default = VolumeTransform::default();
        let coarse = ReconstructionParameters::new(100, 64, 64, 64);
        let fine = ReconstructionParameters::new(200, 64, 64, 64);

        let first = policy(true).reset_transform(&default, &coarse).unwrap();
        let second = policy(true).reset_transform(&default, &fine).unwrap();

        assert!((first.view_axis_translation() - (-35.0)).abs() < 1e-4);
        assert!((second.view_axis_translation() - (-70.0)).abs() < 1e-4);
    }
}
