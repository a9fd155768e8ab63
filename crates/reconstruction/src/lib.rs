//! # Reconstruction
//!
//! Drives an opaque volumetric fusion engine.
//!
//! - [`ReconstructionController`]: engine lifecycle, pose, reset transform policy
//! - [`SharedController`]: the controller behind one lock, usable as a `MeshProvider`
//! - [`MockEngineFactory`]: deterministic engine for tests and the CLI
//!
//! ## Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use reconstruction::{ControllerSettings, MockEngineFactory, ReconstructionController};
//!
//! let factory = Arc::new(MockEngineFactory::default());
//! let mut controller = ReconstructionController::new(factory, ControllerSettings::default());
//! controller.create(ControllerSettings::default().parameters)?;
//!
//! match controller.process(&frame)? {
//!     StepOutcome::Tracked(color) => render(color),
//!     StepOutcome::TrackingFailed => {}
//! }
//! ```

mod controller;
mod error;
mod handle;
pub mod mock_engine;
mod transform;

pub use controller::{ControllerSettings, ReconstructionController, SharedController, StepOutcome};
pub use error::{ReconstructionError, Result};
pub use handle::EngineHandle;
pub use mock_engine::{EngineProbe, MockEngine, MockEngineConfig, MockEngineFactory};
pub use transform::TransformPolicy;
