//! Session event bus
//!
//! Informational status updates and actionable errors travel on two separate
//! bounded channels. Publishing never blocks: events that do not fit are
//! dropped and counted.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_channel::{bounded, Receiver, Sender, TrySendError};
use serde::Serialize;

use crate::{ContractError, ErrorKind, ReconstructionParameters};

/// Informational session event
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum StatusEvent {
    SensorStarted { source: String },
    SensorStopped { source: String },
    EngineCreated { parameters: ReconstructionParameters },
    ResetComplete,
    FrameProcessed { frame_id: u64 },
    FrameRate { fps: f64 },
    ExportComplete {
        path: PathBuf,
        format: String,
        triangles: usize,
    },
}

/// Actionable session error
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorEvent {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame_id: Option<u64>,
}

impl ErrorEvent {
    /// Build an event from an error
    pub fn from_error(error: &ContractError, frame_id: Option<u64>) -> Self {
        Self {
            kind: error.kind(),
            message: error.to_string(),
            frame_id,
        }
    }
}

/// Receiving side of the bus
#[derive(Debug)]
pub struct EventSubscriber {
    pub status: Receiver<StatusEvent>,
    pub errors: Receiver<ErrorEvent>,
}

/// Publishing side of the bus (cheap to clone)
#[derive(Clone)]
pub struct EventBus {
    status_tx: Sender<StatusEvent>,
    error_tx: Sender<ErrorEvent>,
    dropped: Arc<AtomicU64>,
}

impl EventBus {
    /// Create a bus with the given channel capacities
    pub fn new(status_capacity: usize, error_capacity: usize) -> (Self, EventSubscriber) {
        let (status_tx, status_rx) = bounded(status_capacity.max(1));
        let (error_tx, error_rx) = bounded(error_capacity.max(1));

        let bus = Self {
            status_tx,
            error_tx,
            dropped: Arc::new(AtomicU64::new(0)),
        };
        let subscriber = EventSubscriber {
            status: status_rx,
            errors: error_rx,
        };
        (bus, subscriber)
    }

    /// Bus with no listeners, used when the caller does not observe events
    pub fn detached() -> Self {
        Self::new(1, 1).0
    }

    /// Publish a status event
    pub fn publish_status(&self, event: StatusEvent) {
        self.publish(&self.status_tx, event);
    }

    /// Publish an error event
    pub fn publish_error(&self, event: ErrorEvent) {
        self.publish(&self.error_tx, event);
    }

    /// Report an error on the error channel
    pub fn report(&self, error: &ContractError, frame_id: Option<u64>) {
        self.publish_error(ErrorEvent::from_error(error, frame_id));
    }

    /// Events lost because a channel was full
    pub fn dropped_events(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn publish<T>(&self, tx: &Sender<T>, event: T) {
        match tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
            // No subscriber left; nothing to do
            Err(TrySendError::Closed(_)) => {}
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("status_queued", &self.status_tx.len())
            .field("errors_queued", &self.error_tx.len())
            .field("dropped", &self.dropped_events())
            .finish()
    }
}
