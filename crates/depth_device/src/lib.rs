//! # Depth Device
//!
//! Depth source implementations behind the `DepthSource` contract.
//!
//! - [`MockDepthSensor`]: synthetic scene, no hardware needed
//! - [`ReplayDepthSensor`]: plays a recording written by [`RecordingWriter`]
//! - [`DepthSourceFactory`]: picks one from `[sensor]` settings

pub mod error;
pub mod factory;
pub mod mock_sensor;
pub mod replay_sensor;

pub use contracts::{DepthFrameRef, DepthSource};
pub use error::{DeviceError, Result};
pub use factory::DepthSourceFactory;
pub use mock_sensor::{MockDepthSensor, MockDepthSensorConfig};
pub use replay_sensor::{FrameRecord, RecordingWriter, ReplayConfig, ReplayDepthSensor, MANIFEST_FILE};
