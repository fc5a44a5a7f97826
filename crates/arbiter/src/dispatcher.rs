//! Task dispatcher.
//!
//! Consumes classified entities in stream order:
//! - assets refresh the asset registry (or leave it when gone)
//! - actionable tracks without an in-flight task are paired with the nearest
//!   asset, tasked, recorded in the lifecycle tracker and escalated to at
//!   least `SUSPICIOUS`
//!
//! Events are handled one at a time, so the in-flight check and the task
//! recording for a track never interleave within one dispatcher. Separate
//! arbiter processes watching the same stream are not coordinated; the
//! disposition override is a best-effort hint to them, and two processes can
//! still race and task the same track twice.

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use autorecon_core::{Disposition, Entity, Provenance, TaskId, TaskRequest, INTEGRATION_NAME};

use crate::filter::{Classification, ClassifiedEntity};
use crate::lifecycle::TaskLifecycleTracker;
use crate::platform::{EntityApi, TaskApi};
use crate::proximity::select_asset;
use crate::registry::AssetRegistry;

/// Disposition a tasked track is escalated to
pub const OVERRIDE_DISPOSITION: Disposition = Disposition::Suspicious;

/// Result of handling one classified entity
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// Asset snapshot stored
    AssetUpdated {
        /// Asset identifier
        asset_id: String,
    },
    /// Asset dropped from the registry
    AssetRemoved {
        /// Asset identifier
        asset_id: String,
    },
    /// A new task was created for the track
    Tasked {
        /// Platform task identifier
        task_id: TaskId,
        /// Asset assigned
        asset_id: String,
        /// Track investigated
        track_id: String,
        /// Asset-to-track distance in meters
        distance_m: f64,
        /// Whether the disposition override went through
        overridden: bool,
    },
    /// The track already has an in-flight task
    AlreadyTasked {
        /// Existing task
        task_id: TaskId,
        /// Track
        track_id: String,
    },
    /// No asset is currently eligible
    NoAssetAvailable {
        /// Track
        track_id: String,
    },
    /// The task-creation call failed; the next sighting retries
    CreationFailed {
        /// Track
        track_id: String,
        /// Failure description
        reason: String,
    },
    /// The platform issued an identifier that is already tracked
    DuplicateTask {
        /// Offending identifier
        task_id: TaskId,
    },
    /// Nothing to do for this entity
    Ignored {
        /// Entity
        entity_id: String,
    },
}

/// Stateful orchestrator pairing tracks with assets
pub struct TaskDispatcher {
    registry: AssetRegistry,
    tracker: Arc<TaskLifecycleTracker>,
    tasks: Arc<dyn TaskApi>,
    entities: Arc<dyn EntityApi>,
}

impl TaskDispatcher {
    /// Create a dispatcher recording tasks in `tracker`
    pub fn new(
        tasks: Arc<dyn TaskApi>,
        entities: Arc<dyn EntityApi>,
        tracker: Arc<TaskLifecycleTracker>,
    ) -> Self {
        Self {
            registry: AssetRegistry::new(),
            tracker,
            tasks,
            entities,
        }
    }

    /// Known assets
    pub fn registry(&self) -> &AssetRegistry {
        &self.registry
    }

    /// Lifecycle tracker shared with the status listener
    pub fn tracker(&self) -> &Arc<TaskLifecycleTracker> {
        &self.tracker
    }

    /// Handle one classified entity
    pub async fn handle(&self, classified: ClassifiedEntity) -> DispatchOutcome {
        match classified.classification {
            Classification::Asset => self.handle_asset(classified),
            Classification::ActionableTrack if !classified.is_removal() => {
                self.handle_track(&classified.entity).await
            }
            _ => DispatchOutcome::Ignored {
                entity_id: classified.entity.entity_id,
            },
        }
    }

    fn handle_asset(&self, classified: ClassifiedEntity) -> DispatchOutcome {
        let asset_id = classified.entity.entity_id.clone();

        for expired in self.registry.evict_expired(Utc::now()) {
            debug!(asset_id = %expired, "asset expired");
        }

        if classified.is_removal() {
            if self.registry.remove(&asset_id).is_some() {
                info!(asset_id = %asset_id, "asset removed");
            }
            return DispatchOutcome::AssetRemoved { asset_id };
        }

        if self.registry.upsert(classified.entity) {
            info!(asset_id = %asset_id, "new asset available");
        } else {
            debug!(asset_id = %asset_id, "asset refreshed");
        }
        DispatchOutcome::AssetUpdated { asset_id }
    }

    async fn handle_track(&self, track: &Entity) -> DispatchOutcome {
        let track_id = track.entity_id.clone();

        if let Some(task_id) = self.tracker.in_flight_for(&track_id) {
            debug!(track_id = %track_id, task_id = %task_id, "track already tasked");
            return DispatchOutcome::AlreadyTasked { task_id, track_id };
        }

        let assets = self.registry.snapshot(Utc::now());
        let Some(selected) = select_asset(track, &assets) else {
            debug!(track_id = %track_id, "no asset available for track");
            return DispatchOutcome::NoAssetAvailable { track_id };
        };
        let asset_id = selected.asset_id().to_string();
        let distance_m = selected.distance_m;

        let request = TaskRequest::investigate(selected.asset, track);
        let task_id = match self.tasks.create_task(&request).await {
            Ok(task_id) => task_id,
            Err(e) => {
                error!(error = %e, track_id = %track_id, asset_id = %asset_id, "task creation error");
                return DispatchOutcome::CreationFailed {
                    track_id,
                    reason: e.to_string(),
                };
            }
        };
        info!(
            task_id = %task_id,
            asset_id = %asset_id,
            track_id = %track_id,
            distance_m,
            "task created"
        );

        if let Err(e) = self
            .tracker
            .record_creation(task_id.clone(), asset_id.clone(), track_id.clone())
        {
            error!(error = %e, track_id = %track_id, "cannot track created task");
            return DispatchOutcome::DuplicateTask { task_id };
        }

        let overridden = self.override_disposition(track).await;

        DispatchOutcome::Tasked {
            task_id,
            asset_id,
            track_id,
            distance_m,
            overridden,
        }
    }

    /// Escalate a tasked track to `SUSPICIOUS` unless it already ranks higher.
    ///
    /// Failures are logged only; the task stands either way.
    async fn override_disposition(&self, track: &Entity) -> bool {
        if track.disposition().severity() > OVERRIDE_DISPOSITION.severity() {
            debug!(
                track_id = %track.entity_id,
                disposition = ?track.disposition(),
                "track disposition already above override"
            );
            return false;
        }

        let now = Utc::now();
        let provenance = match &track.provenance {
            Some(provenance) => provenance.restamped(now),
            None => Provenance::new(INTEGRATION_NAME, "Auto Reconnaissance", now),
        };

        info!(track_id = %track.entity_id, "overriding disposition for track");
        match self
            .entities
            .override_disposition(&track.entity_id, OVERRIDE_DISPOSITION, &provenance)
            .await
        {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, track_id = %track.entity_id, "disposition override failed");
                false
            }
        }
    }
}
