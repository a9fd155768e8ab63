//! Depth device error types

use contracts::ContractError;
use thiserror::Error;

/// Depth device specific error
#[derive(Debug, Error)]
pub enum DeviceError {
    /// Recording directory or manifest missing
    #[error("recording not found at '{path}': {message}")]
    RecordingNotFound { path: String, message: String },

    /// Recording manifest or frame file malformed
    #[error("invalid recording '{path}': {message}")]
    InvalidRecording { path: String, message: String },

    /// Wrapped ContractError
    #[error(transparent)]
    Contract(#[from] ContractError),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl DeviceError {
    /// Create recording not found error
    pub fn recording_not_found(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RecordingNotFound {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create invalid recording error
    pub fn invalid_recording(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidRecording {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl From<DeviceError> for ContractError {
    fn from(err: DeviceError) -> Self {
        match err {
            DeviceError::Contract(inner) => inner,
            DeviceError::Io(io) => ContractError::Io(io),
            other => ContractError::device_unavailable(other.to_string()),
        }
    }
}

/// Result alias
pub type Result<T> = std::result::Result<T, DeviceError>;
