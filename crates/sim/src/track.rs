//! Simulated unidentified track.
//!
//! Publishes an `UNKNOWN` surface track at a fixed position under a random
//! identifier until stopped.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, trace};
use uuid::Uuid;

use autorecon_arbiter::EntityApi;
use autorecon_core::{
    Aliases, Disposition, Entity, Location, MilView, Ontology, Position, Provenance, Template,
    INTEGRATION_NAME,
};

/// Seconds a track snapshot stays valid
pub const TRACK_EXPIRY: Duration = Duration::from_secs(15);
/// Interval between track snapshots
pub const TRACK_REFRESH: Duration = Duration::from_secs(5);

/// Periodic publisher of one unknown track
pub struct SimulatedTrack {
    entity_id: String,
    latitude: f64,
    longitude: f64,
    entities: Arc<dyn EntityApi>,
    refresh: Duration,
}

impl SimulatedTrack {
    /// Track at `(latitude, longitude)` under a fresh UUID
    pub fn new((latitude, longitude): (f64, f64), entities: Arc<dyn EntityApi>) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), (latitude, longitude), entities)
    }

    /// Track under a caller-chosen identifier
    pub fn with_id(
        entity_id: impl Into<String>,
        (latitude, longitude): (f64, f64),
        entities: Arc<dyn EntityApi>,
    ) -> Self {
        Self {
            entity_id: entity_id.into(),
            latitude,
            longitude,
            entities,
            refresh: TRACK_REFRESH,
        }
    }

    /// Override the publish interval
    pub fn with_refresh(mut self, refresh: Duration) -> Self {
        self.refresh = refresh;
        self
    }

    /// Track identifier
    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    /// Snapshot published at `now`
    pub fn entity(&self, now: DateTime<Utc>) -> Entity {
        Entity {
            entity_id: self.entity_id.clone(),
            is_live: true,
            expiry_time: Some(now + ChronoDuration::seconds(TRACK_EXPIRY.as_secs() as i64)),
            aliases: Aliases {
                name: "Simulated Track".to_string(),
            },
            location: Some(Location {
                position: Position {
                    latitude_degrees: self.latitude,
                    longitude_degrees: self.longitude,
                    altitude_hae_meters: None,
                },
                speed_mps: None,
                velocity_enu: None,
            }),
            mil_view: MilView {
                disposition: Disposition::Unknown,
                environment: Some("ENVIRONMENT_SURFACE".to_string()),
            },
            ontology: Ontology {
                template: Template::Track,
                platform_type: None,
            },
            provenance: Some(Provenance::new(INTEGRATION_NAME, "Simulated Track", now)),
            task_catalog: None,
        }
    }

    /// Publish until `shutdown` fires
    pub async fn run(self, shutdown: CancellationToken) {
        info!(entity_id = %self.entity_id, "starting simulated track");
        loop {
            match self.entities.publish_entity(&self.entity(Utc::now())).await {
                Ok(()) => trace!(entity_id = %self.entity_id, "track published"),
                Err(e) => error!(error = %e, entity_id = %self.entity_id, "error publishing simulated track"),
            }

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.refresh) => {}
            }
        }
        info!(entity_id = %self.entity_id, "simulated track stopped");
    }
}
