//! Reconstruction controller errors

use contracts::ContractError;
use thiserror::Error;

/// Reconstruction error
#[derive(Debug, Error)]
pub enum ReconstructionError {
    /// Operation needs a live engine
    #[error("no reconstruction engine: {operation} called before create")]
    NotCreated { operation: &'static str },

    /// Engine-reported failure
    #[error(transparent)]
    Contract(#[from] ContractError),
}

impl ReconstructionError {
    /// Whether the session cannot continue without operator action
    pub fn is_terminal(&self) -> bool {
        match self {
            Self::NotCreated { .. } => false,
            Self::Contract(inner) => inner.is_terminal(),
        }
    }
}

impl From<ReconstructionError> for ContractError {
    fn from(err: ReconstructionError) -> Self {
        match err {
            ReconstructionError::Contract(inner) => inner,
            not_created @ ReconstructionError::NotCreated { .. } => {
                ContractError::invalid_operation(not_created.to_string())
            }
        }
    }
}

/// Result alias
pub type Result<T> = std::result::Result<T, ReconstructionError>;
