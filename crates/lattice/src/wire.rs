//! JSON bodies exchanged with the platform REST API.
//!
//! Entities travel as [`autorecon_core::Entity`] directly; tasks and agent
//! requests have their own nested wire shape and are flattened into the core
//! model here.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use autorecon_core::{
    AgentRequest, Disposition, EntityEvent, Provenance, Task, TaskId, TaskRequest, TaskStatus,
};

/// Field path targeted by disposition overrides
pub const DISPOSITION_FIELD_PATH: &str = "mil_view.disposition";

/// Long-poll request for entity events
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityEventsRequest<'a> {
    /// Empty for a fresh session
    pub session_token: &'a str,
    /// Maximum events per response
    pub batch_size: u32,
}

/// Long-poll response for entity events
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityEventsResponse {
    /// Token continuing this session
    #[serde(default)]
    pub session_token: String,
    /// Events since the last poll
    #[serde(default)]
    pub entity_events: Vec<EntityEvent>,
}

/// Entity override body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityOverrideRequest<'a> {
    /// Partial entity carrying only the overridden field
    pub entity: OverrideEntity<'a>,
    /// Who overrides and when
    pub provenance: &'a Provenance,
}

/// Entity fragment for a disposition override
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverrideEntity<'a> {
    /// Target entity
    pub entity_id: &'a str,
    /// New disposition
    pub mil_view: MilViewOverride,
}

/// `milView` fragment
#[derive(Debug, Serialize)]
pub struct MilViewOverride {
    /// New disposition
    pub disposition: Disposition,
}

impl<'a> EntityOverrideRequest<'a> {
    /// Body overriding the disposition of `entity_id`
    pub fn disposition(
        entity_id: &'a str,
        disposition: Disposition,
        provenance: &'a Provenance,
    ) -> Self {
        Self {
            entity: OverrideEntity {
                entity_id,
                mil_view: MilViewOverride { disposition },
            },
            provenance,
        }
    }
}

/// Principal (author or assignee) of a task
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Principal {
    /// System principal
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<System>,
}

/// System principal details
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct System {
    /// Authoring service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,
    /// Entity acting as principal
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,
}

impl Principal {
    /// Principal for a service
    pub fn service(name: &str) -> Self {
        Self {
            system: Some(System {
                service_name: Some(name.to_string()),
                entity_id: None,
            }),
        }
    }

    /// Principal for an entity
    pub fn entity(entity_id: &str) -> Self {
        Self {
            system: Some(System {
                service_name: None,
                entity_id: Some(entity_id.to_string()),
            }),
        }
    }

    fn entity_id(&self) -> Option<&str> {
        self.system.as_ref()?.entity_id.as_deref()
    }
}

/// Task relations
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Relations {
    /// Assigned entity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<Principal>,
}

/// Task creation body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    /// Title
    pub display_name: String,
    /// Description
    pub description: String,
    /// Typed specification (`@type` plus fields)
    pub specification: Value,
    /// Creating service
    pub author: Principal,
    /// Assignee
    pub relations: Relations,
    /// Always false: the assignee executes through the platform
    pub is_executed_elsewhere: bool,
}

impl From<&TaskRequest> for CreateTaskRequest {
    fn from(request: &TaskRequest) -> Self {
        let mut specification = serde_json::json!({
            "@type": request.specification_type,
            "objective": { "entityId": request.objective_id },
        });
        if let Some(speed) = request.speed_mps {
            specification["parameters"] = serde_json::json!({ "speedMS": speed });
        }

        Self {
            display_name: request.display_name.clone(),
            description: request.description.clone(),
            specification,
            author: Principal::service(&request.author_service),
            relations: Relations {
                assignee: Some(Principal::entity(&request.assignee_id)),
            },
            is_executed_elsewhere: false,
        }
    }
}

/// Task as returned by the platform
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireTask {
    /// Identifier and version counters
    pub version: WireTaskVersion,
    /// Current status
    #[serde(default)]
    pub status: Option<WireTaskStatus>,
    /// Assignee
    #[serde(default)]
    pub relations: Relations,
    /// Specification, kept untyped
    #[serde(default)]
    pub specification: Value,
}

/// Task version block
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireTaskVersion {
    /// Task identifier
    pub task_id: String,
    /// Status version
    #[serde(default)]
    pub status_version: u64,
}

/// Task status block
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireTaskStatus {
    /// Platform status string, e.g. `STATUS_EXECUTING`
    pub status: String,
}

impl WireTask {
    /// Flatten into the core task model
    pub fn into_task(self) -> Task {
        let objective_id = self.specification["objective"]["entityId"]
            .as_str()
            .unwrap_or_default()
            .to_string();
        let status = self
            .status
            .as_ref()
            .map_or(TaskStatus::Created, |s| status_from_wire(&s.status));

        Task {
            task_id: TaskId::new(self.version.task_id),
            assignee_id: self
                .relations
                .assignee
                .as_ref()
                .and_then(Principal::entity_id)
                .unwrap_or_default()
                .to_string(),
            objective_id,
            status,
            status_version: self.version.status_version,
        }
    }
}

/// Map a platform status string onto the lifecycle statuses tracked here.
///
/// Pre-execution acknowledgements collapse into `Created`; replacement and
/// cancellation states into `Cancelled`.
pub fn status_from_wire(status: &str) -> TaskStatus {
    match status {
        "STATUS_EXECUTING" | "STATUS_WAITING_FOR_UPDATE" => TaskStatus::Executing,
        "STATUS_DONE_OK" => TaskStatus::DoneOk,
        "STATUS_DONE_NOT_OK" => TaskStatus::DoneNotOk,
        "STATUS_CANCELLED" | "STATUS_DONE_CANCELLING" | "STATUS_REPLACED" => {
            TaskStatus::Cancelled
        }
        _ => TaskStatus::Created,
    }
}

/// Status update body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    /// Reporter's status version
    pub status_version: u64,
    /// New status
    pub new_status: NewStatus,
    /// Reporting entity
    pub author: Principal,
}

/// `newStatus` block
#[derive(Debug, Serialize)]
pub struct NewStatus {
    /// Status
    pub status: TaskStatus,
}

/// Agent listen body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListenAsAgentRequest {
    /// Entities to listen for
    pub agent_selector: AgentSelector,
}

/// Entity selector
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSelector {
    /// Selected entities
    pub entity_ids: Vec<String>,
}

impl ListenAsAgentRequest {
    /// Listen on behalf of one asset
    pub fn for_asset(asset_id: &str) -> Self {
        Self {
            agent_selector: AgentSelector {
                entity_ids: vec![asset_id.to_string()],
            },
        }
    }
}

/// Agent listen response; empty when the wait expired
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireAgentRequest {
    /// Execute request
    #[serde(default)]
    pub execute_request: Option<ExecuteRequest>,
    /// Cancel request
    #[serde(default)]
    pub cancel_request: Option<CancelRequest>,
}

/// Execute payload
#[derive(Debug, Deserialize)]
pub struct ExecuteRequest {
    /// Task to execute
    pub task: WireTask,
}

/// Cancel payload
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelRequest {
    /// Task to cancel
    pub task_id: String,
}

impl WireAgentRequest {
    /// Convert into the core request, `None` when the response was empty
    pub fn into_request(self) -> Option<AgentRequest> {
        if let Some(execute) = self.execute_request {
            return Some(AgentRequest::Execute(execute.task.into_task()));
        }
        self.cancel_request.map(|cancel| AgentRequest::Cancel {
            task_id: TaskId::new(cancel.task_id),
        })
    }
}
