//! Error types for the arbitration loop.
//!
//! Collaborator failures are grouped by the call that produced them so the
//! loop can decide between retry-with-backoff and drop-the-event.

use autorecon_core::TaskId;
use thiserror::Error;

/// Failures reported by platform collaborators
#[derive(Debug, Error)]
pub enum PlatformError {
    /// Network fault or unexpected transport status
    #[error("Transport error: {0}")]
    Transport(String),

    /// Response body could not be decoded
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// Credentials rejected
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Task creation call failed
    #[error("Task creation failed: {0}")]
    TaskCreation(String),

    /// Disposition override call failed
    #[error("Disposition override failed for {entity_id}: {reason}")]
    Override {
        /// Entity whose override was rejected
        entity_id: String,
        /// Failure reason
        reason: String,
    },

    /// Task status update call failed
    #[error("Status update failed for task {task_id}: {reason}")]
    StatusUpdate {
        /// Task whose status was rejected
        task_id: TaskId,
        /// Failure reason
        reason: String,
    },

    /// Referenced object does not exist on the platform
    #[error("Not found: {0}")]
    NotFound(String),
}

impl PlatformError {
    /// Whether the failure belongs to the transport class (retried with backoff)
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            PlatformError::Transport(_) | PlatformError::Deserialization(_)
        )
    }
}

/// Protocol invariant violations detected by the lifecycle tracker
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LifecycleError {
    /// Status update or query for a task that was never recorded
    #[error("Unknown task: {0}")]
    UnknownTask(TaskId),

    /// Creation recorded twice for the same platform identifier
    #[error("Duplicate task: {0}")]
    DuplicateTask(TaskId),
}

/// Failures of the coordinating runtime itself
#[derive(Debug, Error)]
pub enum ArbiterError {
    /// A worker task panicked or was aborted
    #[error("Worker {worker} terminated abnormally: {reason}")]
    WorkerFailed {
        /// Worker name
        worker: &'static str,
        /// Join failure description
        reason: String,
    },
}
