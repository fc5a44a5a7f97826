//! Task lifecycle tracking with per-task status versions.
//!
//! Each task carries its own monotonically increasing status version. An
//! update whose version is not strictly greater than the stored one is stale
//! and leaves state untouched. The compare-and-store runs under one lock, so
//! concurrent duplicate deliveries of the same update accept at most once.
//!
//! Tasks leave tracking when a terminal status is accepted. Their final
//! version is kept in a bounded tombstone set so late duplicates of the
//! terminal report still read as stale rather than unknown.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use autorecon_core::{Task, TaskId, TaskStatus};

use crate::error::LifecycleError;

/// Tombstones retained for finished tasks
const DEFAULT_RETIRED_CAPACITY: usize = 1024;

#[derive(Debug, Clone)]
struct TrackedTask {
    assignee_id: String,
    objective_id: String,
    status: TaskStatus,
    version: u64,
}

impl TrackedTask {
    fn to_task(&self, task_id: &TaskId) -> Task {
        Task {
            task_id: task_id.clone(),
            assignee_id: self.assignee_id.clone(),
            objective_id: self.objective_id.clone(),
            status: self.status,
            status_version: self.version,
        }
    }
}

#[derive(Debug, Default)]
struct TrackerState {
    tasks: HashMap<TaskId, TrackedTask>,
    retired: HashMap<TaskId, u64>,
    retired_order: VecDeque<TaskId>,
}

impl TrackerState {
    fn retire(&mut self, task_id: &TaskId, capacity: usize) {
        if let Some(task) = self.tasks.remove(task_id) {
            self.retired.insert(task_id.clone(), task.version);
            self.retired_order.push_back(task_id.clone());
            while self.retired_order.len() > capacity {
                if let Some(oldest) = self.retired_order.pop_front() {
                    self.retired.remove(&oldest);
                }
            }
        }
    }
}

/// Map of task identifier to last accepted status and version
#[derive(Debug)]
pub struct TaskLifecycleTracker {
    state: Mutex<TrackerState>,
    retired_capacity: usize,
}

impl Default for TaskLifecycleTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskLifecycleTracker {
    /// Create an empty tracker
    pub fn new() -> Self {
        Self::with_retired_capacity(DEFAULT_RETIRED_CAPACITY)
    }

    /// Create a tracker remembering at most `capacity` finished tasks
    pub fn with_retired_capacity(capacity: usize) -> Self {
        Self {
            state: Mutex::new(TrackerState::default()),
            retired_capacity: capacity,
        }
    }

    fn lock(&self) -> MutexGuard<'_, TrackerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start tracking a newly created task at version 0, status `CREATED`.
    ///
    /// Platform identifiers are unique; seeing one twice is a protocol fault.
    pub fn record_creation(
        &self,
        task_id: TaskId,
        assignee_id: impl Into<String>,
        objective_id: impl Into<String>,
    ) -> Result<(), LifecycleError> {
        let mut state = self.lock();
        if state.tasks.contains_key(&task_id) || state.retired.contains_key(&task_id) {
            return Err(LifecycleError::DuplicateTask(task_id));
        }
        state.tasks.insert(
            task_id,
            TrackedTask {
                assignee_id: assignee_id.into(),
                objective_id: objective_id.into(),
                status: TaskStatus::Created,
                version: 0,
            },
        );
        Ok(())
    }

    /// Apply a status report.
    ///
    /// Returns `Ok(true)` when the report was newer than the stored state and
    /// has been stored, `Ok(false)` when it was stale or duplicate (or the task
    /// already finished). Reports never create tasks.
    pub fn apply_status(
        &self,
        task_id: &TaskId,
        status: TaskStatus,
        incoming_version: u64,
    ) -> Result<bool, LifecycleError> {
        let mut state = self.lock();

        let Some(task) = state.tasks.get_mut(task_id) else {
            return if state.retired.contains_key(task_id) {
                Ok(false)
            } else {
                Err(LifecycleError::UnknownTask(task_id.clone()))
            };
        };

        if incoming_version <= task.version {
            return Ok(false);
        }

        task.status = status;
        task.version = incoming_version;

        if status.is_terminal() {
            state.retire(task_id, self.retired_capacity);
        }
        Ok(true)
    }

    /// Record a status this process is about to emit, returning its version.
    ///
    /// The version is one past the last accepted one and is never reused for
    /// the lifetime of the task.
    pub fn advance(&self, task_id: &TaskId, status: TaskStatus) -> Result<u64, LifecycleError> {
        let mut state = self.lock();
        let task = state
            .tasks
            .get_mut(task_id)
            .ok_or_else(|| LifecycleError::UnknownTask(task_id.clone()))?;

        task.version += 1;
        task.status = status;
        let version = task.version;

        if status.is_terminal() {
            state.retire(task_id, self.retired_capacity);
        }
        Ok(version)
    }

    /// Whether the task's current status is `EXECUTING`
    pub fn is_executing(&self, task_id: &TaskId) -> Result<bool, LifecycleError> {
        let state = self.lock();
        match state.tasks.get(task_id) {
            Some(task) => Ok(task.status == TaskStatus::Executing),
            None if state.retired.contains_key(task_id) => Ok(false),
            None => Err(LifecycleError::UnknownTask(task_id.clone())),
        }
    }

    /// Current status and version of a tracked task
    pub fn status(&self, task_id: &TaskId) -> Option<(TaskStatus, u64)> {
        self.lock()
            .tasks
            .get(task_id)
            .map(|task| (task.status, task.version))
    }

    /// Full view of a tracked task
    pub fn task(&self, task_id: &TaskId) -> Option<Task> {
        self.lock()
            .tasks
            .get(task_id)
            .map(|task| task.to_task(task_id))
    }

    /// Whether the task finished and left tracking
    pub fn is_retired(&self, task_id: &TaskId) -> bool {
        self.lock().retired.contains_key(task_id)
    }

    /// In-flight task whose objective is `objective_id`
    pub fn in_flight_for(&self, objective_id: &str) -> Option<TaskId> {
        self.lock()
            .tasks
            .iter()
            .find(|(_, task)| task.objective_id == objective_id && task.status.is_in_flight())
            .map(|(task_id, _)| task_id.clone())
    }

    /// Every tracked task, ordered by identifier
    pub fn tasks(&self) -> Vec<Task> {
        let state = self.lock();
        let mut tasks: Vec<Task> = state
            .tasks
            .iter()
            .map(|(task_id, task)| task.to_task(task_id))
            .collect();
        tasks.sort_by(|a, b| a.task_id.cmp(&b.task_id));
        tasks
    }

    /// Number of tracked tasks
    pub fn len(&self) -> usize {
        self.lock().tasks.len()
    }

    /// Whether no tasks are tracked
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
