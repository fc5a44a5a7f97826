//! Task model: tasking requests, lifecycle statuses and agent traffic.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::entity::Entity;

/// Specification type for reconnaissance tasks
pub const INVESTIGATE_SPECIFICATION: &str = "type.googleapis.com/anduril.tasks.v2.Investigate";

/// Platform-assigned task identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl TaskId {
    /// Wrap a platform identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Lifecycle status of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    /// Created, not yet picked up by the assignee
    #[serde(rename = "STATUS_CREATED")]
    Created,
    /// Assignee confirmed execution
    #[serde(rename = "STATUS_EXECUTING")]
    Executing,
    /// Finished successfully
    #[serde(rename = "STATUS_DONE_OK")]
    DoneOk,
    /// Finished unsuccessfully
    #[serde(rename = "STATUS_DONE_NOT_OK")]
    DoneNotOk,
    /// Cancelled before completion
    #[serde(rename = "STATUS_CANCELLED")]
    Cancelled,
}

impl TaskStatus {
    /// Whether no further transitions follow this status
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::DoneOk | TaskStatus::DoneNotOk | TaskStatus::Cancelled
        )
    }

    /// Whether the task still occupies its objective
    pub fn is_in_flight(&self) -> bool {
        matches!(self, TaskStatus::Created | TaskStatus::Executing)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TaskStatus::Created => "CREATED",
            TaskStatus::Executing => "EXECUTING",
            TaskStatus::DoneOk => "DONE_OK",
            TaskStatus::DoneNotOk => "DONE_NOT_OK",
            TaskStatus::Cancelled => "CANCELLED",
        };
        f.write_str(label)
    }
}

/// A unit of work assigned to an asset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Platform identifier
    pub task_id: TaskId,
    /// Asset executing the task
    pub assignee_id: String,
    /// Track under investigation
    pub objective_id: String,
    /// Last known status
    pub status: TaskStatus,
    /// Status version of `status`
    pub status_version: u64,
}

/// Everything the platform needs to create a task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRequest {
    /// Short title shown to operators
    pub display_name: String,
    /// Longer description
    pub description: String,
    /// Specification type URL
    pub specification_type: String,
    /// Asset to task
    pub assignee_id: String,
    /// Track to investigate
    pub objective_id: String,
    /// Speed the asset should use, taken from its last report
    pub speed_mps: Option<f64>,
    /// Service authoring the task
    pub author_service: String,
}

impl TaskRequest {
    /// Investigate request sending `asset` to `track`
    pub fn investigate(asset: &Entity, track: &Entity) -> Self {
        Self {
            display_name: format!("Asset {} -> Track {}", asset.entity_id, track.entity_id),
            description: format!(
                "Asset {} tasked to perform ISR on Track {}",
                asset.entity_id, track.entity_id
            ),
            specification_type: INVESTIGATE_SPECIFICATION.to_string(),
            assignee_id: asset.entity_id.clone(),
            objective_id: track.entity_id.clone(),
            speed_mps: asset.speed_mps(),
            author_service: "auto-reconnaissance".to_string(),
        }
    }
}

/// Status report for a task, emitted by its assignee
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEvent {
    /// Task the report refers to
    pub task_id: TaskId,
    /// Reported status
    pub status: TaskStatus,
    /// Reporter's status version
    pub status_version: u64,
    /// Entity that authored the report
    pub author_id: Option<String>,
}

/// Request delivered to an asset listening as agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgentRequest {
    /// Start executing a task
    Execute(Task),
    /// Stop a task
    Cancel {
        /// Task to cancel
        task_id: TaskId,
    },
}

impl AgentRequest {
    /// Task the request refers to
    pub fn task_id(&self) -> &TaskId {
        match self {
            AgentRequest::Execute(task) => &task.task_id,
            AgentRequest::Cancel { task_id } => task_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Template;

    #[test]
    fn test_terminal_statuses() {
        assert!(!TaskStatus::Created.is_terminal());
        assert!(!TaskStatus::Executing.is_terminal());
        assert!(TaskStatus::DoneOk.is_terminal());
        assert!(TaskStatus::DoneNotOk.is_terminal());
        assert!(TaskStatus::Cancelled.is_terminal());

        assert!(TaskStatus::Created.is_in_flight());
        assert!(TaskStatus::Executing.is_in_flight());
        assert!(!TaskStatus::Cancelled.is_in_flight());
    }

    #[test]
    fn test_status_wire_names() {
        let json = serde_json::to_string(&TaskStatus::DoneNotOk).unwrap();
        assert_eq!(json, r#""STATUS_DONE_NOT_OK""#);

        let status: TaskStatus = serde_json::from_str(r#""STATUS_EXECUTING""#).unwrap();
        assert_eq!(status, TaskStatus::Executing);
    }

    #[test]
    fn test_investigate_request() {
        let mut asset = Entity::new("asset-01", Template::Asset).at(0.0, 0.0);
        if let Some(location) = asset.location.as_mut() {
            location.speed_mps = Some(1.0);
        }
        let track = Entity::new("track-9", Template::Track).at(1.0, 1.0);

        let request = TaskRequest::investigate(&asset, &track);
        assert_eq!(request.display_name, "Asset asset-01 -> Track track-9");
        assert_eq!(
            request.description,
            "Asset asset-01 tasked to perform ISR on Track track-9"
        );
        assert_eq!(request.specification_type, INVESTIGATE_SPECIFICATION);
        assert_eq!(request.assignee_id, "asset-01");
        assert_eq!(request.objective_id, "track-9");
        assert_eq!(request.speed_mps, Some(1.0));
    }
}
