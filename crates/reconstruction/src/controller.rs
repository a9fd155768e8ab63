//! Reconstruction controller
//!
//! Owns the engine lifecycle, the current pose and the world-to-volume
//! transform policy. One controller drives one engine at a time; changing the
//! volume parameters always tears the engine down and builds a new one.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use contracts::{
    ColorBuffer, ContractError, DepthConversion, DepthFrame, EngineFactory, EventBus,
    MeshProvider, MeshSnapshot, Pose, ReconstructionConfig, ReconstructionParameters,
    StatusEvent, VolumeTransform,
};
use tracing::{debug, info, instrument, warn};

use crate::error::{ReconstructionError, Result};
use crate::handle::EngineHandle;
use crate::transform::TransformPolicy;

/// Controller settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControllerSettings {
    pub parameters: ReconstructionParameters,
    pub conversion: DepthConversion,
    pub translate_reset_pose_by_min_depth: bool,
}

impl From<&ReconstructionConfig> for ControllerSettings {
    fn from(config: &ReconstructionConfig) -> Self {
        Self {
            parameters: config.parameters,
            conversion: config.depth_conversion(),
            translate_reset_pose_by_min_depth: config.translate_reset_pose_by_min_depth,
        }
    }
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self::from(&ReconstructionConfig::default())
    }
}

impl ControllerSettings {
    fn policy(&self) -> TransformPolicy {
        TransformPolicy {
            shift_by_min_depth: self.translate_reset_pose_by_min_depth,
            min_depth_clip: self.conversion.min_depth_clip,
            max_depth_clip: self.conversion.max_depth_clip,
        }
    }
}

/// Result of one reconstruction step
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// Frame aligned and integrated; carries the shaded view
    Tracked(ColorBuffer),
    /// Frame did not align; pose unchanged
    TrackingFailed,
}

/// Reconstruction controller
pub struct ReconstructionController {
    factory: Arc<dyn EngineFactory>,
    settings: ControllerSettings,
    engine: Option<EngineHandle>,
    pose: Pose,
    default_transform: VolumeTransform,
    applied_transform: VolumeTransform,
    events: Option<EventBus>,
}

impl ReconstructionController {
    /// Controller with no engine yet; call [`create`](Self::create) next
    pub fn new(factory: Arc<dyn EngineFactory>, settings: ControllerSettings) -> Self {
        Self {
            factory,
            settings,
            engine: None,
            pose: Pose::identity(),
            default_transform: VolumeTransform::default(),
            applied_transform: VolumeTransform::default(),
            events: None,
        }
    }

    /// Publish `EngineCreated` and `ResetComplete` on `events`
    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    fn publish(&self, event: StatusEvent) {
        if let Some(events) = &self.events {
            events.publish_status(event);
        }
    }

    /// Create an engine for `parameters`
    ///
    /// Any existing engine is disposed first. With the min-depth shift
    /// enabled the fresh volume is reset onto the shifted transform.
    ///
    /// # Errors
    /// `NoCompatibleDevice` or `CreationFailed` from the factory, or a failed
    /// initial reset. On error no engine is kept and nothing is published.
    #[instrument(name = "controller_create", skip(self), fields(voxels_per_meter = parameters.voxels_per_meter))]
    pub fn create(&mut self, parameters: ReconstructionParameters) -> Result<()> {
        if let Some(old) = self.engine.take() {
            old.dispose();
        }
        self.settings.parameters = parameters;
        self.pose = Pose::identity();

        let engine = self.factory.create(&parameters, None).inspect_err(|e| {
            warn!(error = %e, "engine creation failed");
        })?;
        let engine = EngineHandle::new(engine);
        self.default_transform = engine.default_world_to_volume_transform();
        self.applied_transform = self.default_transform;
        self.engine = Some(engine);

        let shift = self.settings.translate_reset_pose_by_min_depth;
        if shift {
            if let Err(e) = self.reset_volume() {
                warn!(error = %e, "initial reset failed, disposing engine");
                self.dispose();
                return Err(e);
            }
        }

        info!(
            resolution = ?(parameters.resolution_x, parameters.resolution_y, parameters.resolution_z),
            voxels = parameters.voxel_count(),
            "reconstruction engine created"
        );
        self.publish(StatusEvent::EngineCreated { parameters });
        if shift {
            self.publish(StatusEvent::ResetComplete);
        }
        Ok(())
    }

    /// Destroy the current engine and create one for `parameters`
    pub fn reconfigure(&mut self, parameters: ReconstructionParameters) -> Result<()> {
        debug!(from = ?self.settings.parameters, to = ?parameters, "reconfiguring volume");
        self.dispose();
        self.create(parameters)
    }

    /// Clear the volume and return the pose to identity
    #[instrument(name = "controller_reset", skip(self))]
    pub fn reset(&mut self) -> Result<()> {
        self.reset_volume()?;
        self.publish(StatusEvent::ResetComplete);
        Ok(())
    }

    fn reset_volume(&mut self) -> Result<()> {
        let engine = self
            .engine
            .as_mut()
            .ok_or(ReconstructionError::NotCreated { operation: "reset" })?;

        self.pose = Pose::identity();
        let shifted = self
            .settings
            .policy()
            .reset_transform(&self.default_transform, &self.settings.parameters);
        engine.reset(&self.pose, shifted.as_ref())?;
        self.applied_transform = shifted.unwrap_or(self.default_transform);

        debug!(
            view_axis_translation = self.applied_transform.view_axis_translation(),
            shifted = shifted.is_some(),
            "reconstruction reset"
        );
        Ok(())
    }

    /// Run one track-and-integrate step
    ///
    /// The pose only changes when tracking succeeds.
    pub fn process(&mut self, frame: &DepthFrame) -> Result<StepOutcome> {
        let engine = self
            .engine
            .as_mut()
            .ok_or(ReconstructionError::NotCreated { operation: "process" })?;

        let float = engine.depth_to_float(frame, &self.settings.conversion)?;
        let outcome = engine.process_frame(&float, &self.pose)?;
        if !outcome.tracking_succeeded {
            return Ok(StepOutcome::TrackingFailed);
        }

        self.pose = outcome.pose;
        let cloud = engine.compute_point_cloud(&self.pose)?;
        let color = engine.shade(&cloud)?;
        Ok(StepOutcome::Tracked(color))
    }

    /// Extract the current surface mesh
    pub fn calculate_mesh(&self, detail_level: u32) -> Result<MeshSnapshot> {
        let engine = self
            .engine
            .as_ref()
            .ok_or(ReconstructionError::NotCreated { operation: "calculate_mesh" })?;
        Ok(engine.calculate_mesh(detail_level)?)
    }

    /// Release the engine; later calls fail until the next `create`
    pub fn dispose(&mut self) {
        if let Some(engine) = self.engine.take() {
            engine.dispose();
        }
    }

    pub fn is_created(&self) -> bool {
        self.engine.is_some()
    }

    pub fn pose(&self) -> Pose {
        self.pose
    }

    pub fn parameters(&self) -> ReconstructionParameters {
        self.settings.parameters
    }

    pub fn settings(&self) -> &ControllerSettings {
        &self.settings
    }

    /// Transform captured from the engine at creation
    pub fn default_volume_transform(&self) -> VolumeTransform {
        self.default_transform
    }

    /// Transform the volume currently uses
    pub fn current_volume_transform(&self) -> VolumeTransform {
        self.applied_transform
    }
}

impl std::fmt::Debug for ReconstructionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconstructionController")
            .field("settings", &self.settings)
            .field("engine", &self.engine)
            .field("pose", &self.pose)
            .finish_non_exhaustive()
    }
}

/// Controller shared between the frame scheduler and the exporter
///
/// Frame steps and mesh snapshots both take this lock, so an export never
/// reads the volume while a step is writing it.
#[derive(Debug, Clone)]
pub struct SharedController(Arc<Mutex<ReconstructionController>>);

impl SharedController {
    pub fn new(controller: ReconstructionController) -> Self {
        Self(Arc::new(Mutex::new(controller)))
    }

    /// Lock the controller
    ///
    /// A panic inside an engine call poisons the lock; the controller state
    /// is still consistent because the pose is only written after success.
    pub fn lock(&self) -> MutexGuard<'_, ReconstructionController> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl MeshProvider for SharedController {
    fn snapshot_mesh(&self, detail_level: u32) -> std::result::Result<MeshSnapshot, ContractError> {
        Ok(self.lock().calculate_mesh(detail_level)?)
    }
}
