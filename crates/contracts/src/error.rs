//! Layered error definitions
//!
//! Categorized by source: device / engine / mesh / export / config

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Device Errors =====
    /// Depth sensor is not connected or not supported
    #[error("depth device unavailable: {message}")]
    DeviceUnavailable { message: String },

    /// Depth sensor is already streaming for another consumer
    #[error("depth device in use: {message}")]
    DeviceInUse { message: String },

    // ===== Engine Errors =====
    /// No GPU / compute device able to host the reconstruction volume
    #[error("no compatible compute device: {message}")]
    NoCompatibleDevice { message: String },

    /// Engine creation failed (typically out of memory for the volume)
    #[error("reconstruction engine creation failed: {message}")]
    CreationFailed { message: String },

    /// Camera tracking lost for a frame
    #[error("camera tracking failed for frame {frame_id}")]
    TrackingFailed { frame_id: u64 },

    /// Engine rejected a call because of its internal state
    #[error("invalid engine operation: {message}")]
    InvalidOperation { message: String },

    // ===== Mesh / Export Errors =====
    /// Mesh snapshot violates the unindexed triangle layout
    #[error("invalid mesh: {message}")]
    InvalidMesh { message: String },

    /// Export format tag not recognized
    #[error("unrecognized export format: '{format}'")]
    UnrecognizedExportFormat { format: String },

    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ContractError {
    /// Create device unavailable error
    pub fn device_unavailable(message: impl Into<String>) -> Self {
        Self::DeviceUnavailable {
            message: message.into(),
        }
    }

    /// Create device in use error
    pub fn device_in_use(message: impl Into<String>) -> Self {
        Self::DeviceInUse {
            message: message.into(),
        }
    }

    /// Create no compatible compute device error
    pub fn no_compatible_device(message: impl Into<String>) -> Self {
        Self::NoCompatibleDevice {
            message: message.into(),
        }
    }

    /// Create engine creation error
    pub fn creation_failed(message: impl Into<String>) -> Self {
        Self::CreationFailed {
            message: message.into(),
        }
    }

    /// Create invalid engine operation error
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Create invalid mesh error
    pub fn invalid_mesh(message: impl Into<String>) -> Self {
        Self::InvalidMesh {
            message: message.into(),
        }
    }

    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Category reported on the session error channel
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DeviceUnavailable { .. } => ErrorKind::DeviceUnavailable,
            Self::DeviceInUse { .. } => ErrorKind::DeviceInUse,
            Self::NoCompatibleDevice { .. } => ErrorKind::NoCompatibleComputeDevice,
            Self::CreationFailed { .. } => ErrorKind::EngineCreationFailed,
            Self::TrackingFailed { .. } => ErrorKind::TrackingFailed,
            Self::InvalidOperation { .. } => ErrorKind::InvalidOperation,
            Self::InvalidMesh { .. } => ErrorKind::InvalidMesh,
            Self::UnrecognizedExportFormat { .. } => ErrorKind::UnrecognizedExportFormat,
            Self::ConfigParse { .. } | Self::ConfigValidation { .. } => ErrorKind::Configuration,
            Self::Io(_) => ErrorKind::FileIoFailed,
        }
    }

    /// Whether the error ends the current session component
    ///
    /// Device and engine-creation errors are terminal; tracking failures are
    /// expected during normal operation.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::DeviceUnavailable
                | ErrorKind::DeviceInUse
                | ErrorKind::NoCompatibleComputeDevice
                | ErrorKind::EngineCreationFailed
        )
    }
}

/// Error category carried by [`crate::ErrorEvent`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    DeviceUnavailable,
    DeviceInUse,
    NoCompatibleComputeDevice,
    EngineCreationFailed,
    TrackingFailed,
    InvalidOperation,
    InvalidMesh,
    FileIoFailed,
    UnrecognizedExportFormat,
    Configuration,
}
