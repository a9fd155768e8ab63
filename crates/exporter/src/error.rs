//! Exporter error types

use contracts::{ContractError, ErrorKind};
use thiserror::Error;

/// Exporter-specific errors
#[derive(Debug, Error)]
pub enum ExportError {
    /// Invalid mesh, unknown format and other contract failures
    #[error(transparent)]
    Contract(#[from] ContractError),

    /// Writing the mesh or the counter file failed
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Counter file holds something other than an integer
    #[error("counter file '{path}' is corrupt: {content:?}")]
    CorruptCounter { path: String, content: String },

    /// Export worker has shut down
    #[error("export worker is not running")]
    WorkerClosed,

    /// Blocking export task panicked or was cancelled
    #[error("export task failed: {0}")]
    Task(String),
}

impl ExportError {
    /// Category reported on the error channel
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Contract(inner) => inner.kind(),
            Self::Io(_) | Self::CorruptCounter { .. } => ErrorKind::FileIoFailed,
            Self::WorkerClosed | Self::Task(_) => ErrorKind::InvalidOperation,
        }
    }
}

impl From<ExportError> for ContractError {
    fn from(err: ExportError) -> Self {
        match err {
            ExportError::Contract(inner) => inner,
            ExportError::Io(io) => ContractError::Io(io),
            other => ContractError::Io(std::io::Error::other(other.to_string())),
        }
    }
}

/// Exporter Result alias
pub type Result<T> = std::result::Result<T, ExportError>;
