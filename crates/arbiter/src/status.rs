//! Task status listener.
//!
//! Second suspension point of the arbiter: waits for status reports echoed
//! back by tasked assets and feeds them through the lifecycle tracker. Stale
//! reports are dropped quietly, reports for unknown tasks are logged as
//! protocol faults, transport faults back off for a fixed interval.

use async_trait::async_trait;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace};

use autorecon_core::{StatusEvent, TaskId};

use crate::error::{LifecycleError, PlatformError};
use crate::lifecycle::TaskLifecycleTracker;
use crate::platform::{PollOutcome, StatusEventSource, TaskApi};

/// What became of one status report
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusOutcome {
    /// Newer than the stored state; applied
    Accepted,
    /// Not newer than the stored state; dropped
    Stale,
    /// Refers to a task that is not tracked; dropped
    Rejected(LifecycleError),
}

/// Apply one report to the tracker, logging at the severity its outcome deserves
pub fn apply_status_event(tracker: &TaskLifecycleTracker, event: &StatusEvent) -> StatusOutcome {
    match tracker.apply_status(&event.task_id, event.status, event.status_version) {
        Ok(true) => {
            info!(
                task_id = %event.task_id,
                status = %event.status,
                status_version = event.status_version,
                "task status updated"
            );
            StatusOutcome::Accepted
        }
        Ok(false) => {
            debug!(
                task_id = %event.task_id,
                status_version = event.status_version,
                "discarding stale task status"
            );
            StatusOutcome::Stale
        }
        Err(e) => {
            error!(error = %e, status = %event.status, "rejecting task status");
            StatusOutcome::Rejected(e)
        }
    }
}

/// Long-lived consumer of task status reports
pub struct StatusListener {
    source: Arc<dyn StatusEventSource>,
    tracker: Arc<TaskLifecycleTracker>,
    backoff: Duration,
}

impl StatusListener {
    /// Create a listener feeding `tracker`
    pub fn new(
        source: Arc<dyn StatusEventSource>,
        tracker: Arc<TaskLifecycleTracker>,
        backoff: Duration,
    ) -> Self {
        Self {
            source,
            tracker,
            backoff,
        }
    }

    /// Run until `shutdown` fires
    pub async fn run(self, shutdown: CancellationToken) {
        info!("starting task status listener");

        loop {
            let polled = tokio::select! {
                _ = shutdown.cancelled() => break,
                result = self.source.poll_status() => result,
            };

            match polled {
                Ok(PollOutcome::Ready(event)) => {
                    apply_status_event(&self.tracker, &event);
                }
                Ok(PollOutcome::TimedOut) => {
                    trace!("status long poll timed out, reissuing");
                }
                Err(e) => {
                    error!(error = %e, backoff_secs = self.backoff.as_secs_f64(), "task status listen error");
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = tokio::time::sleep(self.backoff) => {}
                    }
                }
            }
        }

        info!("task status listener stopped");
    }
}

/// Status source that polls the platform for every in-flight task.
///
/// For platforms that only expose task lookups: each poll walks the tracked
/// tasks and reports the first one whose platform version moved past ours.
/// A full pass without news waits `interval` and reports a timeout.
pub struct PollingStatusSource {
    tasks: Arc<dyn TaskApi>,
    tracker: Arc<TaskLifecycleTracker>,
    interval: Duration,
    pending: Mutex<Vec<TaskId>>,
}

impl PollingStatusSource {
    /// Poll through `tasks` for the tasks held in `tracker`
    pub fn new(
        tasks: Arc<dyn TaskApi>,
        tracker: Arc<TaskLifecycleTracker>,
        interval: Duration,
    ) -> Self {
        Self {
            tasks,
            tracker,
            interval,
            pending: Mutex::new(Vec::new()),
        }
    }

    fn next_pending(&self) -> Option<TaskId> {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        pending.pop()
    }

    fn refill(&self) -> bool {
        let mut ids: Vec<TaskId> = self.tracker.tasks().into_iter().map(|t| t.task_id).collect();
        ids.reverse();
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        *pending = ids;
        !pending.is_empty()
    }
}

#[async_trait]
impl StatusEventSource for PollingStatusSource {
    async fn poll_status(&self) -> Result<PollOutcome<StatusEvent>, PlatformError> {
        if self.refill() {
            while let Some(task_id) = self.next_pending() {
                let Some((_, known_version)) = self.tracker.status(&task_id) else {
                    continue;
                };

                let task = match self.tasks.get_task(&task_id).await {
                    Ok(task) => task,
                    Err(PlatformError::NotFound(_)) => continue,
                    Err(e) => return Err(e),
                };

                if task.status_version > known_version {
                    return Ok(PollOutcome::Ready(StatusEvent {
                        task_id,
                        status: task.status,
                        status_version: task.status_version,
                        author_id: Some(task.assignee_id),
                    }));
                }
            }
        }

        tokio::time::sleep(self.interval).await;
        Ok(PollOutcome::TimedOut)
    }
}
