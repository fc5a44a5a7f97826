//! Collaborator contracts consumed by the arbitration loop.
//!
//! The platform client, the in-memory test platform and the simulators all
//! meet the arbiter at these traits; wire encoding never leaks past them.

use async_trait::async_trait;
use std::sync::Arc;

use autorecon_core::{
    AgentRequest, Disposition, Entity, EntityEvent, Provenance, StatusEvent, Task, TaskId,
    TaskRequest, TaskStatus,
};

use crate::error::PlatformError;

/// Result of one long-poll wait.
///
/// A wait that runs into the server-side or client-side timeout is a normal
/// outcome, distinct from a transport failure, and is simply reissued.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome<T> {
    /// The wait produced data
    Ready(T),
    /// The wait expired without data
    TimedOut,
}

/// Source of entity change events
#[async_trait]
pub trait EntityEventSource: Send + Sync {
    /// Establish a fresh stream session, discarding any previous one
    async fn connect(&self) -> Result<(), PlatformError> {
        Ok(())
    }

    /// Wait for the next batch of entity events
    async fn poll_events(&self) -> Result<PollOutcome<Vec<EntityEvent>>, PlatformError>;
}

/// Entity publication and override calls
#[async_trait]
pub trait EntityApi: Send + Sync {
    /// Publish or refresh an entity snapshot
    async fn publish_entity(&self, entity: &Entity) -> Result<(), PlatformError>;

    /// Override the disposition of an entity owned by another publisher
    async fn override_disposition(
        &self,
        entity_id: &str,
        disposition: Disposition,
        provenance: &Provenance,
    ) -> Result<(), PlatformError>;
}

/// Task creation and status calls
#[async_trait]
pub trait TaskApi: Send + Sync {
    /// Create a task, returning the platform-assigned identifier
    async fn create_task(&self, request: &TaskRequest) -> Result<TaskId, PlatformError>;

    /// Fetch the platform's current view of a task
    async fn get_task(&self, task_id: &TaskId) -> Result<Task, PlatformError>;

    /// Report a new status for a task
    async fn update_task_status(
        &self,
        task_id: &TaskId,
        status: TaskStatus,
        status_version: u64,
        author_id: &str,
    ) -> Result<(), PlatformError>;
}

/// Source of task status reports echoed back by tasked assets
#[async_trait]
pub trait StatusEventSource: Send + Sync {
    /// Wait for the next status report
    async fn poll_status(&self) -> Result<PollOutcome<StatusEvent>, PlatformError>;
}

/// Agent-side listening for task requests
#[async_trait]
pub trait AgentApi: Send + Sync {
    /// Wait for the next request addressed to `asset_id`
    async fn listen_as_agent(
        &self,
        asset_id: &str,
    ) -> Result<PollOutcome<AgentRequest>, PlatformError>;
}

/// Collaborators the arbiter needs, bundled for construction
#[derive(Clone)]
pub struct Collaborators {
    /// Entity stream
    pub events: Arc<dyn EntityEventSource>,
    /// Entity overrides
    pub entities: Arc<dyn EntityApi>,
    /// Task creation
    pub tasks: Arc<dyn TaskApi>,
    /// Status reports
    pub statuses: Arc<dyn StatusEventSource>,
}

impl Collaborators {
    /// Bundle one implementation that plays every role
    pub fn from_platform<P>(platform: Arc<P>) -> Self
    where
        P: EntityEventSource + EntityApi + TaskApi + StatusEventSource + 'static,
    {
        Self {
            events: platform.clone(),
            entities: platform.clone(),
            tasks: platform.clone(),
            statuses: platform,
        }
    }
}
