//! Simulated friendly asset.
//!
//! Publishes itself every few seconds with a short expiry, so it drops out of
//! arbitration soon after it stops, and answers agent requests: execute
//! requests are confirmed as `EXECUTING`, cancel requests as `DONE_NOT_OK`.
//! Status versions come from the asset's own lifecycle tracker.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace};

use autorecon_arbiter::{
    AgentApi, EntityApi, PlatformError, PollOutcome, TaskApi, TaskLifecycleTracker,
};
use autorecon_core::{
    AgentRequest, Aliases, Disposition, Entity, Enu, Location, MilView, Ontology, Position,
    Provenance, TaskCatalog, TaskDefinition, TaskId, TaskStatus, Template,
    INTEGRATION_NAME, INVESTIGATE_SPECIFICATION,
};

/// Seconds an asset snapshot stays valid
pub const ASSET_EXPIRY: Duration = Duration::from_secs(15);
/// Interval between asset snapshots
pub const ASSET_REFRESH: Duration = Duration::from_secs(5);
/// Altitude reported by the asset, above mean sea level
pub const ASSET_ALTITUDE_M: f64 = 55.0;
/// Wait after a failed agent listen
pub const LISTEN_BACKOFF: Duration = Duration::from_secs(1);

/// Friendly surface asset answering investigate tasks
pub struct SimulatedAsset {
    asset_id: String,
    latitude: f64,
    longitude: f64,
    entities: Arc<dyn EntityApi>,
    tasks: Arc<dyn TaskApi>,
    agent: Arc<dyn AgentApi>,
    tracker: TaskLifecycleTracker,
    refresh: Duration,
}

impl SimulatedAsset {
    /// Asset at `(latitude, longitude)` reporting through the given collaborators
    pub fn new(
        asset_id: impl Into<String>,
        (latitude, longitude): (f64, f64),
        entities: Arc<dyn EntityApi>,
        tasks: Arc<dyn TaskApi>,
        agent: Arc<dyn AgentApi>,
    ) -> Self {
        Self {
            asset_id: asset_id.into(),
            latitude,
            longitude,
            entities,
            tasks,
            agent,
            tracker: TaskLifecycleTracker::new(),
            refresh: ASSET_REFRESH,
        }
    }

    /// Override the publish interval
    pub fn with_refresh(mut self, refresh: Duration) -> Self {
        self.refresh = refresh;
        self
    }

    /// Asset identifier
    pub fn asset_id(&self) -> &str {
        &self.asset_id
    }

    /// Tasks this asset has seen, with the versions it reported
    pub fn tracker(&self) -> &TaskLifecycleTracker {
        &self.tracker
    }

    /// Snapshot published at `now`
    pub fn entity(&self, now: DateTime<Utc>) -> Entity {
        Entity {
            entity_id: self.asset_id.clone(),
            is_live: true,
            expiry_time: Some(now + expiry_offset()),
            aliases: Aliases {
                name: format!("Simulated Asset {}", self.asset_id),
            },
            location: Some(Location {
                position: Position {
                    latitude_degrees: self.latitude,
                    longitude_degrees: self.longitude,
                    altitude_hae_meters: Some(ASSET_ALTITUDE_M),
                },
                speed_mps: Some(1.0),
                velocity_enu: Some(Enu {
                    e: 1.0,
                    n: 1.0,
                    u: 0.0,
                }),
            }),
            mil_view: MilView {
                disposition: Disposition::Friendly,
                environment: Some("ENVIRONMENT_SURFACE".to_string()),
            },
            ontology: Ontology {
                template: Template::Asset,
                platform_type: Some("USV".to_string()),
            },
            provenance: Some(Provenance::new(INTEGRATION_NAME, "Simulated Asset", now)),
            task_catalog: Some(TaskCatalog {
                task_definitions: vec![TaskDefinition {
                    task_specification_url: INVESTIGATE_SPECIFICATION.to_string(),
                }],
            }),
        }
    }

    /// Publish and listen until `shutdown` fires
    pub async fn run(self, shutdown: CancellationToken) {
        info!(asset_id = %self.asset_id, "starting simulated asset");
        tokio::join!(self.publish_loop(&shutdown), self.listen_loop(&shutdown));
        info!(asset_id = %self.asset_id, "shutting down simulated asset");
    }

    async fn publish_loop(&self, shutdown: &CancellationToken) {
        loop {
            match self.entities.publish_entity(&self.entity(Utc::now())).await {
                Ok(()) => trace!(asset_id = %self.asset_id, "asset published"),
                Err(e) => error!(error = %e, asset_id = %self.asset_id, "asset publish error"),
            }

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.refresh) => {}
            }
        }
    }

    async fn listen_loop(&self, shutdown: &CancellationToken) {
        loop {
            let polled = tokio::select! {
                _ = shutdown.cancelled() => break,
                polled = self.agent.listen_as_agent(&self.asset_id) => polled,
            };

            match polled {
                Ok(PollOutcome::Ready(request)) => {
                    if let Err(e) = self.handle_request(request).await {
                        error!(error = %e, asset_id = %self.asset_id, "simulated asset task processing error");
                    }
                }
                Ok(PollOutcome::TimedOut) => {}
                Err(e) => {
                    error!(error = %e, asset_id = %self.asset_id, "simulated asset listening agent error");
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = tokio::time::sleep(LISTEN_BACKOFF) => {}
                    }
                }
            }
        }
    }

    /// Answer one agent request, returning the status and version reported
    pub async fn handle_request(
        &self,
        request: AgentRequest,
    ) -> Result<(TaskStatus, u64), PlatformError> {
        info!(asset_id = %self.asset_id, task_id = %request.task_id(), "received task request");
        let (task_id, status) = match request {
            AgentRequest::Execute(task) => {
                self.remember(&task.task_id, &task.objective_id);
                (task.task_id, TaskStatus::Executing)
            }
            AgentRequest::Cancel { task_id } => {
                self.remember(&task_id, "");
                (task_id, TaskStatus::DoneNotOk)
            }
        };

        let version = match self.tracker.advance(&task_id, status) {
            Ok(version) => version,
            Err(e) => {
                debug!(error = %e, task_id = %task_id, "task already finished, not reporting");
                return Ok(self.tracker.status(&task_id).unwrap_or((status, 0)));
            }
        };

        self.tasks
            .update_task_status(&task_id, status, version, &self.asset_id)
            .await?;
        info!(task_id = %task_id, status = %status, status_version = version, "task status reported");
        Ok((status, version))
    }

    fn remember(&self, task_id: &TaskId, objective_id: &str) {
        if self.tracker.status(task_id).is_some() || self.tracker.is_retired(task_id) {
            return;
        }
        if let Err(e) =
            self.tracker
                .record_creation(task_id.clone(), self.asset_id.clone(), objective_id)
        {
            debug!(error = %e, task_id = %task_id, "task already known");
        }
    }
}

fn expiry_offset() -> ChronoDuration {
    ChronoDuration::seconds(ASSET_EXPIRY.as_secs() as i64)
}
