//! Scheduler error types

use contracts::ContractError;
use thiserror::Error;

/// Scheduler error
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Constructed outside a tokio runtime
    #[error("frame scheduler must be created inside a tokio runtime")]
    NoRuntime,

    /// Depth source failed to start or stop
    #[error("depth source '{source_name}' failed: {error}")]
    Source {
        source_name: String,
        #[source]
        error: ContractError,
    },
}

/// Scheduler Result alias
pub type Result<T> = std::result::Result<T, SchedulerError>;
