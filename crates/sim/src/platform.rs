//! In-process stand-in for the surveillance platform.
//!
//! Holds entities, tasks and the three long-poll channels (entity events,
//! task statuses, agent requests) in memory. Every long poll waits for new
//! data up to `long_poll_timeout` and then reports a timeout, like the real
//! service. Faults can be scripted per channel and single calls can be made
//! to fail, which is what the arbiter tests lean on.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

use autorecon_arbiter::{
    AgentApi, EntityApi, EntityEventSource, PlatformError, PollOutcome, StatusEventSource, TaskApi,
};
use autorecon_core::{
    AgentRequest, Disposition, Entity, EntityEvent, EntityEventType, Provenance, StatusEvent,
    Task, TaskId, TaskRequest, TaskStatus,
};

/// Default wait before an idle long poll reports a timeout
pub const DEFAULT_LONG_POLL_TIMEOUT: Duration = Duration::from_secs(30);

/// Scripted outcome consumed by the next poll on a channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedStep {
    /// Fail the poll with a transport error
    Fault(String),
    /// Report an immediate timeout
    Timeout,
}

/// Disposition override applied through the platform
#[derive(Debug, Clone, PartialEq)]
pub struct DispositionOverride {
    /// Overridden entity
    pub entity_id: String,
    /// New disposition
    pub disposition: Disposition,
    /// Provenance sent with the override
    pub provenance: Provenance,
}

/// Status update received from an assignee
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    /// Task
    pub task_id: TaskId,
    /// Reported status
    pub status: TaskStatus,
    /// Reported version
    pub status_version: u64,
    /// Reporter
    pub author_id: String,
}

#[derive(Default)]
struct PlatformState {
    entities: HashMap<String, Entity>,
    entity_events: VecDeque<EntityEvent>,
    entity_script: VecDeque<ScriptedStep>,
    connects: u64,

    tasks: HashMap<TaskId, Task>,
    task_requests: Vec<TaskRequest>,
    next_task: u64,
    fail_next_create: Option<String>,

    overrides: Vec<DispositionOverride>,
    fail_next_override: Option<String>,

    status_events: VecDeque<StatusEvent>,
    status_script: VecDeque<ScriptedStep>,
    status_updates: Vec<StatusUpdate>,

    agent_requests: HashMap<String, VecDeque<AgentRequest>>,
}

/// In-memory platform implementing every collaborator trait
pub struct InMemoryPlatform {
    state: Mutex<PlatformState>,
    entity_changed: Notify,
    status_changed: Notify,
    agent_changed: Notify,
    long_poll_timeout: Duration,
}

impl Default for InMemoryPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryPlatform {
    /// Empty platform with the default long-poll timeout
    pub fn new() -> Self {
        Self::with_long_poll_timeout(DEFAULT_LONG_POLL_TIMEOUT)
    }

    /// Empty platform whose idle long polls time out after `timeout`
    pub fn with_long_poll_timeout(timeout: Duration) -> Self {
        Self {
            state: Mutex::new(PlatformState::default()),
            entity_changed: Notify::new(),
            status_changed: Notify::new(),
            agent_changed: Notify::new(),
            long_poll_timeout: timeout,
        }
    }

    fn lock(&self) -> MutexGuard<'_, PlatformState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Remove an entity, emitting a deletion event
    pub fn delete_entity(&self, entity_id: &str) -> Option<Entity> {
        let removed = {
            let mut state = self.lock();
            let removed = state.entities.remove(entity_id)?;
            state.entity_events.push_back(EntityEvent {
                event_type: EntityEventType::Deleted,
                entity: removed.clone(),
            });
            removed
        };
        self.entity_changed.notify_waiters();
        Some(removed)
    }

    /// Queue a scripted step for the next entity poll
    pub fn script_entity_stream(&self, step: ScriptedStep) {
        self.lock().entity_script.push_back(step);
        self.entity_changed.notify_waiters();
    }

    /// Queue a scripted step for the next status poll
    pub fn script_status_stream(&self, step: ScriptedStep) {
        self.lock().status_script.push_back(step);
        self.status_changed.notify_waiters();
    }

    /// Make the next task creation fail
    pub fn fail_next_create(&self, reason: impl Into<String>) {
        self.lock().fail_next_create = Some(reason.into());
    }

    /// Make the next disposition override fail
    pub fn fail_next_override(&self, reason: impl Into<String>) {
        self.lock().fail_next_override = Some(reason.into());
    }

    /// Ask the assignee of `task_id` to stop
    pub fn cancel_task(&self, task_id: &TaskId) -> Result<(), PlatformError> {
        {
            let mut state = self.lock();
            let assignee = state
                .tasks
                .get(task_id)
                .map(|task| task.assignee_id.clone())
                .ok_or_else(|| PlatformError::NotFound(task_id.to_string()))?;
            state
                .agent_requests
                .entry(assignee)
                .or_default()
                .push_back(AgentRequest::Cancel {
                    task_id: task_id.clone(),
                });
        }
        self.agent_changed.notify_waiters();
        Ok(())
    }

    /// Current snapshot of an entity
    pub fn entity(&self, entity_id: &str) -> Option<Entity> {
        self.lock().entities.get(entity_id).cloned()
    }

    /// Task creation requests received so far
    pub fn task_requests(&self) -> Vec<TaskRequest> {
        self.lock().task_requests.clone()
    }

    /// Current platform view of a task
    pub fn task(&self, task_id: &TaskId) -> Option<Task> {
        self.lock().tasks.get(task_id).cloned()
    }

    /// Overrides applied so far
    pub fn overrides(&self) -> Vec<DispositionOverride> {
        self.lock().overrides.clone()
    }

    /// Status updates received so far
    pub fn status_updates(&self) -> Vec<StatusUpdate> {
        self.lock().status_updates.clone()
    }

    /// Entity stream sessions opened
    pub fn connects(&self) -> u64 {
        self.lock().connects
    }

    fn emit_entity(&self, entity: Entity) {
        {
            let mut state = self.lock();
            let event_type = if state.entities.contains_key(&entity.entity_id) {
                EntityEventType::Update
            } else {
                EntityEventType::Created
            };
            state
                .entities
                .insert(entity.entity_id.clone(), entity.clone());
            state.entity_events.push_back(EntityEvent { event_type, entity });
        }
        self.entity_changed.notify_waiters();
    }

    fn take_entity_events(&self) -> Option<Result<PollOutcome<Vec<EntityEvent>>, PlatformError>> {
        let mut state = self.lock();
        if let Some(step) = state.entity_script.pop_front() {
            return Some(scripted(step));
        }
        if state.entity_events.is_empty() {
            return None;
        }
        Some(Ok(PollOutcome::Ready(state.entity_events.drain(..).collect())))
    }

    fn take_status_event(&self) -> Option<Result<PollOutcome<StatusEvent>, PlatformError>> {
        let mut state = self.lock();
        if let Some(step) = state.status_script.pop_front() {
            return Some(scripted(step));
        }
        state
            .status_events
            .pop_front()
            .map(|event| Ok(PollOutcome::Ready(event)))
    }

    fn take_agent_request(&self, asset_id: &str) -> Option<AgentRequest> {
        self.lock()
            .agent_requests
            .get_mut(asset_id)
            .and_then(VecDeque::pop_front)
    }

    /// Long-poll `take` until it yields or the timeout passes
    async fn long_poll<T>(
        &self,
        notify: &Notify,
        mut take: impl FnMut() -> Option<Result<PollOutcome<T>, PlatformError>>,
    ) -> Result<PollOutcome<T>, PlatformError> {
        let deadline = tokio::time::Instant::now() + self.long_poll_timeout;
        loop {
            let notified = notify.notified();
            if let Some(outcome) = take() {
                return outcome;
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Ok(PollOutcome::TimedOut);
            }
        }
    }
}

fn scripted<T>(step: ScriptedStep) -> Result<PollOutcome<T>, PlatformError> {
    match step {
        ScriptedStep::Fault(reason) => Err(PlatformError::Transport(reason)),
        ScriptedStep::Timeout => Ok(PollOutcome::TimedOut),
    }
}

#[async_trait]
impl EntityEventSource for InMemoryPlatform {
    /// New sessions start with a snapshot of every current entity
    async fn connect(&self) -> Result<(), PlatformError> {
        {
            let mut state = self.lock();
            state.connects += 1;
            let mut snapshot: Vec<Entity> = state.entities.values().cloned().collect();
            snapshot.sort_by(|a, b| a.entity_id.cmp(&b.entity_id));
            state.entity_events = snapshot
                .into_iter()
                .map(|entity| EntityEvent {
                    event_type: EntityEventType::Preexisting,
                    entity,
                })
                .collect();
        }
        debug!("in-memory entity session opened");
        Ok(())
    }

    async fn poll_events(&self) -> Result<PollOutcome<Vec<EntityEvent>>, PlatformError> {
        self.long_poll(&self.entity_changed, || self.take_entity_events())
            .await
    }
}

#[async_trait]
impl EntityApi for InMemoryPlatform {
    async fn publish_entity(&self, entity: &Entity) -> Result<(), PlatformError> {
        self.emit_entity(entity.clone());
        Ok(())
    }

    async fn override_disposition(
        &self,
        entity_id: &str,
        disposition: Disposition,
        provenance: &Provenance,
    ) -> Result<(), PlatformError> {
        let updated = {
            let mut state = self.lock();
            if let Some(reason) = state.fail_next_override.take() {
                warn!(entity_id, "failing scripted disposition override");
                return Err(PlatformError::Override {
                    entity_id: entity_id.to_string(),
                    reason,
                });
            }
            let Some(entity) = state.entities.get(entity_id) else {
                return Err(PlatformError::NotFound(entity_id.to_string()));
            };
            let updated = entity.clone().with_disposition(disposition);
            state.overrides.push(DispositionOverride {
                entity_id: entity_id.to_string(),
                disposition,
                provenance: provenance.clone(),
            });
            updated
        };
        self.emit_entity(updated);
        Ok(())
    }
}

#[async_trait]
impl TaskApi for InMemoryPlatform {
    async fn create_task(&self, request: &TaskRequest) -> Result<TaskId, PlatformError> {
        let task = {
            let mut state = self.lock();
            if let Some(reason) = state.fail_next_create.take() {
                warn!(objective_id = %request.objective_id, "failing scripted task creation");
                return Err(PlatformError::TaskCreation(reason));
            }
            state.next_task += 1;
            let task = Task {
                task_id: TaskId::new(format!("task-{:04}", state.next_task)),
                assignee_id: request.assignee_id.clone(),
                objective_id: request.objective_id.clone(),
                status: TaskStatus::Created,
                status_version: 0,
            };
            state.task_requests.push(request.clone());
            state.tasks.insert(task.task_id.clone(), task.clone());
            state
                .agent_requests
                .entry(task.assignee_id.clone())
                .or_default()
                .push_back(AgentRequest::Execute(task.clone()));
            task
        };
        self.agent_changed.notify_waiters();
        info!(task_id = %task.task_id, assignee_id = %task.assignee_id, "in-memory task created");
        Ok(task.task_id)
    }

    async fn get_task(&self, task_id: &TaskId) -> Result<Task, PlatformError> {
        self.task(task_id)
            .ok_or_else(|| PlatformError::NotFound(task_id.to_string()))
    }

    /// Stores newer versions and echoes every update to status listeners
    async fn update_task_status(
        &self,
        task_id: &TaskId,
        status: TaskStatus,
        status_version: u64,
        author_id: &str,
    ) -> Result<(), PlatformError> {
        {
            let mut state = self.lock();
            let Some(task) = state.tasks.get_mut(task_id) else {
                return Err(PlatformError::StatusUpdate {
                    task_id: task_id.clone(),
                    reason: "unknown task".to_string(),
                });
            };
            if status_version > task.status_version {
                task.status = status;
                task.status_version = status_version;
            }
            state.status_updates.push(StatusUpdate {
                task_id: task_id.clone(),
                status,
                status_version,
                author_id: author_id.to_string(),
            });
            state.status_events.push_back(StatusEvent {
                task_id: task_id.clone(),
                status,
                status_version,
                author_id: Some(author_id.to_string()),
            });
        }
        self.status_changed.notify_waiters();
        Ok(())
    }
}

#[async_trait]
impl StatusEventSource for InMemoryPlatform {
    async fn poll_status(&self) -> Result<PollOutcome<StatusEvent>, PlatformError> {
        self.long_poll(&self.status_changed, || self.take_status_event())
            .await
    }
}

#[async_trait]
impl AgentApi for InMemoryPlatform {
    async fn listen_as_agent(
        &self,
        asset_id: &str,
    ) -> Result<PollOutcome<AgentRequest>, PlatformError> {
        self.long_poll(&self.agent_changed, || {
            self.take_agent_request(asset_id)
                .map(|request| Ok(PollOutcome::Ready(request)))
        })
        .await
    }
}
