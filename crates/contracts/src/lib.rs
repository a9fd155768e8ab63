//! # Contracts
//!
//! Frozen interface contracts shared by every crate in the workspace.
//! Business crates depend on this crate only; reverse dependencies are prohibited.
//!
//! ## Collaborators
//! - [`DepthSource`]: asynchronous producer of depth frames
//! - [`ReconstructionEngine`] / [`EngineFactory`]: opaque volumetric fusion engine
//! - [`MeshProvider`]: anything that can hand out a [`MeshSnapshot`] on demand
//!
//! ## Units
//! - Depth pixels are millimetres (`u16`), float depth is metres (`f32`)
//! - Poses and volume transforms are column-vector 4x4 matrices

mod blueprint;
mod depth;
mod depth_source;
mod engine;
mod error;
mod events;
mod geometry;
mod mesh;

pub use blueprint::*;
pub use depth::{DepthFrame, DepthFrameRef, FloatFrame};
pub use depth_source::{depth_callback, DepthFrameCallback, DepthSource};
pub use engine::*;
pub use error::*;
pub use events::*;
pub use geometry::*;
pub use mesh::*;
