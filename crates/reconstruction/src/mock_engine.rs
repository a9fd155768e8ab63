//! Deterministic in-process engine
//!
//! Stands in for a GPU fusion engine in the CLI and in tests. It does no real
//! fusion: tracking always succeeds unless configured otherwise, the pose
//! drifts by a fixed step per integrated frame, and the mesh is a cube.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use bytes::Bytes;
use contracts::{
    ColorBuffer, ContractError, DepthConversion, DepthFrame, EngineFactory, FloatFrame,
    MeshSnapshot, PointCloud, Pose, ReconstructionEngine, ReconstructionParameters,
    TrackingOutcome, VolumeTransform,
};
use nalgebra::{Matrix4, Point3, Vector3};
use tracing::trace;

/// Focal length at 640 px width
const REFERENCE_FOCAL_PX: f32 = 525.0;

/// Per-frame pose drift along X (metres)
const POSE_STEP_M: f32 = 0.001;

/// Mock engine behaviour
#[derive(Debug, Clone)]
pub struct MockEngineConfig {
    /// `false` makes creation fail with `NoCompatibleDevice`
    pub device_available: bool,

    /// Volumes with more voxels fail with `CreationFailed`
    pub max_voxels: u64,

    /// Simulated cost of one track-and-integrate step
    pub step_delay: Duration,

    /// Frames whose id is a multiple of this fail tracking
    pub fail_every: Option<u64>,

    /// Frames whose id is a multiple of this raise `InvalidOperation`
    pub invalid_every: Option<u64>,

    /// Every reset raises `InvalidOperation`
    pub fail_reset: bool,

    /// Cube edge length (metres)
    pub cube_size: f32,
}

impl Default for MockEngineConfig {
    fn default() -> Self {
        Self {
            device_available: true,
            max_voxels: 512 * 512 * 512,
            step_delay: Duration::ZERO,
            fail_every: None,
            invalid_every: None,
            fail_reset: false,
            cube_size: 0.5,
        }
    }
}

/// Observations shared between the factory, its engines and tests
#[derive(Debug, Default)]
pub struct EngineProbe {
    created: AtomicUsize,
    disposed: AtomicUsize,
    active_steps: AtomicUsize,
    max_concurrent_steps: AtomicUsize,
    steps: AtomicU64,
    processed: Mutex<Vec<u64>>,
    resets: Mutex<Vec<Option<VolumeTransform>>>,
}

impl EngineProbe {
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn disposed(&self) -> usize {
        self.disposed.load(Ordering::SeqCst)
    }

    /// Highest number of steps observed running at once
    pub fn max_concurrent_steps(&self) -> usize {
        self.max_concurrent_steps.load(Ordering::SeqCst)
    }

    /// Steps started, including failed ones
    pub fn steps(&self) -> u64 {
        self.steps.load(Ordering::SeqCst)
    }

    /// Frame ids handed to `process_frame`, in call order
    pub fn processed_frames(&self) -> Vec<u64> {
        self.processed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Transform argument of every `reset` call
    pub fn reset_transforms(&self) -> Vec<Option<VolumeTransform>> {
        self.resets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

struct StepGuard<'a>(&'a EngineProbe);

impl<'a> StepGuard<'a> {
    fn enter(probe: &'a EngineProbe) -> Self {
        let active = probe.active_steps.fetch_add(1, Ordering::SeqCst) + 1;
        probe.max_concurrent_steps.fetch_max(active, Ordering::SeqCst);
        probe.steps.fetch_add(1, Ordering::SeqCst);
        Self(probe)
    }
}

impl Drop for StepGuard<'_> {
    fn drop(&mut self) {
        self.0.active_steps.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Mock engine instance
pub struct MockEngine {
    parameters: ReconstructionParameters,
    config: MockEngineConfig,
    probe: Arc<EngineProbe>,
    transform: VolumeTransform,
    integrated_frames: u64,
    last_depth: FloatFrame,
}

impl MockEngine {
    pub fn new(
        parameters: ReconstructionParameters,
        config: MockEngineConfig,
        probe: Arc<EngineProbe>,
    ) -> Self {
        probe.created.fetch_add(1, Ordering::SeqCst);
        let transform = Self::default_transform(&parameters);
        Self {
            parameters,
            config,
            probe,
            transform,
            integrated_frames: 0,
            last_depth: FloatFrame::default(),
        }
    }

    /// Scale by voxel density, centre X/Y in the volume, sensor on the front face
    fn default_transform(parameters: &ReconstructionParameters) -> VolumeTransform {
        let vpm = parameters.voxels_per_meter as f32;
        let mut m = Matrix4::from_diagonal(&nalgebra::Vector4::new(vpm, vpm, vpm, 1.0));
        m[(0, 3)] = parameters.resolution_x as f32 / 2.0;
        m[(1, 3)] = parameters.resolution_y as f32 / 2.0;
        VolumeTransform(m)
    }

    /// Number of frames integrated since the last reset
    pub fn integrated_frames(&self) -> u64 {
        self.integrated_frames
    }

    fn cube(&self, detail_level: u32) -> MeshSnapshot {
        let half = self.config.cube_size / 2.0;
        let voxel = 1.0 / self.parameters.voxels_per_meter as f32;
        // Snap the cube to the sampling grid so coarser detail levels differ.
        let step = voxel * detail_level as f32;
        let half = ((half / step).round() * step).max(step);
        let center = Point3::new(0.0, 0.0, 1.0);

        let axes: [Vector3<f32>; 6] = [
            Vector3::x(),
            -Vector3::x(),
            Vector3::y(),
            -Vector3::y(),
            Vector3::z(),
            -Vector3::z(),
        ];

        let mut mesh = MeshSnapshot::default();
        for n in axes {
            let u = if n.x.abs() > 0.5 { Vector3::y() } else { Vector3::x() };
            let v = n.cross(&u);
            let corner = |su: f32, sv: f32| center + (n + u * su + v * sv) * half;
            let quad = [
                corner(-1.0, -1.0),
                corner(1.0, -1.0),
                corner(1.0, 1.0),
                corner(-1.0, 1.0),
            ];
            for tri in [[0, 1, 2], [0, 2, 3]] {
                for i in tri {
                    mesh.triangle_indices.push(mesh.vertices.len() as u32);
                    mesh.vertices.push(quad[i]);
                    mesh.normals.push(n);
                }
            }
        }
        mesh
    }
}

impl ReconstructionEngine for MockEngine {
    fn default_world_to_volume_transform(&self) -> VolumeTransform {
        Self::default_transform(&self.parameters)
    }

    fn depth_to_float(
        &self,
        frame: &DepthFrame,
        conversion: &DepthConversion,
    ) -> Result<FloatFrame, ContractError> {
        let width = frame.width as usize;
        let expected = width * frame.height as usize;
        if frame.len() != expected || width == 0 {
            return Err(ContractError::invalid_operation(format!(
                "frame {} has {} samples, expected {}",
                frame.frame_id,
                frame.len(),
                expected
            )));
        }

        let (near, far) = (
            conversion.min_depth_clip.min(conversion.max_depth_clip),
            conversion.min_depth_clip.max(conversion.max_depth_clip),
        );
        let mut depth: Vec<f32> = frame
            .pixels()
            .map(|mm| {
                let m = mm as f32 / 1000.0;
                if (near..=far).contains(&m) {
                    m
                } else {
                    0.0
                }
            })
            .collect();

        if conversion.mirror {
            for row in depth.chunks_exact_mut(width) {
                row.reverse();
            }
        }

        Ok(FloatFrame {
            frame_id: frame.frame_id,
            width: frame.width,
            height: frame.height,
            depth,
        })
    }

    fn process_frame(
        &mut self,
        frame: &FloatFrame,
        pose: &Pose,
    ) -> Result<TrackingOutcome, ContractError> {
        let _step = StepGuard::enter(&self.probe);
        self.probe
            .processed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(frame.frame_id);

        if !self.config.step_delay.is_zero() {
            thread::sleep(self.config.step_delay);
        }

        let hits = |every: Option<u64>| every.is_some_and(|n| n > 0 && frame.frame_id % n == 0);

        if hits(self.config.invalid_every) {
            return Err(ContractError::invalid_operation(format!(
                "engine rejected frame {}",
                frame.frame_id
            )));
        }

        if hits(self.config.fail_every) {
            trace!(frame_id = frame.frame_id, "mock tracking failure");
            return Ok(TrackingOutcome {
                tracking_succeeded: false,
                pose: *pose,
            });
        }

        self.integrated_frames += 1;
        self.last_depth = frame.clone();
        let step = Pose::from_translation(Vector3::new(POSE_STEP_M, 0.0, 0.0));
        Ok(TrackingOutcome {
            tracking_succeeded: true,
            pose: Pose(pose.matrix() * step.matrix()),
        })
    }

    fn compute_point_cloud(&self, _pose: &Pose) -> Result<PointCloud, ContractError> {
        let frame = &self.last_depth;
        let (w, h) = (frame.width as usize, frame.height as usize);
        let focal = REFERENCE_FOCAL_PX * frame.width as f32 / 640.0;

        let mut cloud = PointCloud {
            width: frame.width,
            height: frame.height,
            points: Vec::with_capacity(w * h),
            normals: Vec::with_capacity(w * h),
        };
        for (i, &z) in frame.depth.iter().enumerate() {
            let (x, y) = ((i % w) as f32, (i / w) as f32);
            cloud.points.push(Point3::new(
                (x - w as f32 / 2.0) * z / focal,
                (h as f32 / 2.0 - y) * z / focal,
                z,
            ));
            cloud.normals.push(-Vector3::z());
        }
        Ok(cloud)
    }

    fn shade(&self, cloud: &PointCloud) -> Result<ColorBuffer, ContractError> {
        let mut data = Vec::with_capacity(cloud.points.len() * 4);
        for p in &cloud.points {
            let intensity = if p.z > 0.0 {
                (255.0 * (1.0 - p.z / 8.0)).clamp(0.0, 255.0) as u8
            } else {
                0
            };
            data.extend_from_slice(&[intensity, intensity, intensity, 255]);
        }
        Ok(ColorBuffer {
            width: cloud.width,
            height: cloud.height,
            data: Bytes::from(data),
        })
    }

    fn reset(&mut self, _pose: &Pose, transform: Option<&VolumeTransform>) -> Result<(), ContractError> {
        self.probe
            .resets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(transform.copied());
        if self.config.fail_reset {
            return Err(ContractError::invalid_operation("volume reset rejected"));
        }
        if let Some(transform) = transform {
            self.transform = *transform;
        }
        self.integrated_frames = 0;
        self.last_depth = FloatFrame::default();
        Ok(())
    }

    fn calculate_mesh(&self, detail_level: u32) -> Result<MeshSnapshot, ContractError> {
        if detail_level == 0 {
            return Err(ContractError::invalid_operation("detail level must be at least 1"));
        }
        if self.integrated_frames == 0 {
            return Ok(MeshSnapshot::default());
        }
        Ok(self.cube(detail_level))
    }

    fn dispose(&mut self) {
        self.probe.disposed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Factory producing [`MockEngine`]s that share one probe
#[derive(Debug, Clone, Default)]
pub struct MockEngineFactory {
    config: MockEngineConfig,
    probe: Arc<EngineProbe>,
}

impl MockEngineFactory {
    pub fn new(config: MockEngineConfig) -> Self {
        Self {
            config,
            probe: Arc::new(EngineProbe::default()),
        }
    }

    pub fn probe(&self) -> Arc<EngineProbe> {
        self.probe.clone()
    }
}

impl EngineFactory for MockEngineFactory {
    fn create(
        &self,
        params: &ReconstructionParameters,
        transform: Option<&VolumeTransform>,
    ) -> Result<Box<dyn ReconstructionEngine>, ContractError> {
        if !self.config.device_available {
            return Err(ContractError::no_compatible_device(
                "no compute device supports volumetric reconstruction",
            ));
        }
        if params.voxel_count() > self.config.max_voxels {
            return Err(ContractError::creation_failed(format!(
                "volume of {} voxels exceeds device capacity of {}",
                params.voxel_count(),
                self.config.max_voxels
            )));
        }

        let mut engine = MockEngine::new(*params, self.config.clone(), self.probe.clone());
        if let Some(transform) = transform {
            engine.transform = *transform;
        }
        Ok(Box::new(engine))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::DepthFrameRef;

    fn frame(frame_id: u64, pixels: &[u16], width: u32) -> DepthFrame {
        DepthFrame::copy_from(&DepthFrameRef {
            frame_id,
            timestamp: 0.0,
            width,
            height: pixels.len() as u32 / width,
            pixels,
        })
    }

    fn params() -> ReconstructionParameters {
        ReconstructionParameters::new(64, 32, 32, 32)
    }

    #[test]
    fn test_depth_to_float_clips_and_mirrors() {
        let engine = MockEngine::new(params(), MockEngineConfig::default(), Arc::default());
        let input = frame(1, &[100, 1000, 2000, 9000], 2);

        let plain = engine
            .depth_to_float(&input, &DepthConversion::default())
            .unwrap();
        assert_eq!(plain.depth, vec![0.0, 1.0, 2.0, 0.0]);

        let mirrored = engine
            .depth_to_float(
                &input,
                &DepthConversion {
                    mirror: true,
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(mirrored.depth, vec![1.0, 0.0, 0.0, 2.0]);
    }

    #[test]
    fn test_depth_to_float_rejects_size_mismatch() {
        let engine = MockEngine::new(params(), MockEngineConfig::default(), Arc::default());
        let mut input = frame(1, &[1000; 4], 2);
        input.width = 3;
        assert!(matches!(
            engine.depth_to_float(&input, &DepthConversion::default()),
            Err(ContractError::InvalidOperation { .. })
        ));
    }

    #[test]
    fn test_factory_errors() {
        let unavailable = MockEngineFactory::new(MockEngineConfig {
            device_available: false,
            ..Default::default()
        });
        assert!(matches!(
            unavailable.create(&params(), None),
            Err(ContractError::NoCompatibleDevice { .. })
        ));

        let small = MockEngineFactory::new(MockEngineConfig {
            max_voxels: 10,
            ..Default::default()
        });
        assert!(matches!(
            small.create(&params(), None),
            Err(ContractError::CreationFailed { .. })
        ));
    }

    #[test]
    fn test_mesh_is_empty_until_integrated() {
        let factory = MockEngineFactory::default();
        let mut engine = factory.create(&params(), None).unwrap();
        assert!(engine.calculate_mesh(1).unwrap().is_empty());

        let float = engine
            .depth_to_float(&frame(1, &[1000; 4], 2), &DepthConversion::default())
            .unwrap();
        let outcome = engine.process_frame(&float, &Pose::identity()).unwrap();
        assert!(outcome.tracking_succeeded);

        let mesh = engine.calculate_mesh(1).unwrap();
        assert_eq!(mesh.vertices.len(), 36);
        assert_eq!(mesh.triangle_count(), 12);
        mesh.validate().unwrap();
    }

    #[test]
    fn test_fail_every_keeps_pose() {
        let factory = MockEngineFactory::new(MockEngineConfig {
            fail_every: Some(2),
            ..Default::default()
        });
        let mut engine = factory.create(&params(), None).unwrap();
        let float = FloatFrame {
            frame_id: 4,
            width: 1,
            height: 1,
            depth: vec![1.0],
        };
        let pose = Pose::from_translation(Vector3::new(1.0, 2.0, 3.0));
        let outcome = engine.process_frame(&float, &pose).unwrap();
        assert!(!outcome.tracking_succeeded);
        assert_eq!(outcome.pose, pose);
        assert_eq!(factory.probe().processed_frames(), vec![4]);
    }
}
