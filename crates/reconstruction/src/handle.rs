//! Scoped engine ownership
//!
//! The engine holds finite compute resources. [`EngineHandle`] disposes it
//! exactly once, either explicitly or when the handle is dropped.

use std::ops::{Deref, DerefMut};

use contracts::ReconstructionEngine;
use tracing::debug;

/// Owning handle around one engine instance
pub struct EngineHandle {
    engine: Box<dyn ReconstructionEngine>,
    disposed: bool,
}

impl EngineHandle {
    pub fn new(engine: Box<dyn ReconstructionEngine>) -> Self {
        Self {
            engine,
            disposed: false,
        }
    }

    /// Release the engine now
    pub fn dispose(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if !self.disposed {
            self.disposed = true;
            self.engine.dispose();
            debug!("reconstruction engine disposed");
        }
    }
}

impl Deref for EngineHandle {
    type Target = dyn ReconstructionEngine;

    fn deref(&self) -> &Self::Target {
        self.engine.as_ref()
    }
}

impl DerefMut for EngineHandle {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.engine.as_mut()
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineHandle")
            .field("disposed", &self.disposed)
            .finish_non_exhaustive()
    }
}
