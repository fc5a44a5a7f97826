//! Entity model published by the surveillance platform.
//!
//! Field names follow the platform's camelCase JSON so snapshots can be
//! decoded straight off the wire. Enumerations accept unknown values into an
//! `Other` variant instead of failing, keeping classification fail-safe.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::GeoPoint;

/// Ontology template of an entity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Template {
    /// Own-side resource that can be tasked
    #[serde(rename = "TEMPLATE_ASSET")]
    Asset,
    /// Externally observed object
    #[serde(rename = "TEMPLATE_TRACK")]
    Track,
    /// Any other or unrecognized template
    #[default]
    #[serde(other)]
    Other,
}

/// Military disposition of an entity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Disposition {
    /// Own or allied force
    #[serde(rename = "DISPOSITION_FRIENDLY")]
    Friendly,
    /// Confirmed hostile
    #[serde(rename = "DISPOSITION_HOSTILE")]
    Hostile,
    /// Suspected hostile
    #[serde(rename = "DISPOSITION_SUSPICIOUS")]
    Suspicious,
    /// Not yet assessed
    #[serde(rename = "DISPOSITION_UNKNOWN")]
    Unknown,
    /// Unrecognized value
    #[default]
    #[serde(other)]
    Other,
}

impl Disposition {
    /// Threat ordering used when escalating a track.
    ///
    /// `Friendly < Unknown < Suspicious < Hostile`; unrecognized values rank
    /// with `Unknown`.
    pub fn severity(&self) -> u8 {
        match self {
            Disposition::Friendly => 0,
            Disposition::Unknown | Disposition::Other => 1,
            Disposition::Suspicious => 2,
            Disposition::Hostile => 3,
        }
    }

    /// Whether this disposition already ranks at or above `other`
    pub fn at_least(&self, other: Disposition) -> bool {
        self.severity() >= other.severity()
    }
}

/// Kind of change carried by an entity event
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityEventType {
    /// Entity existed before the stream session started
    #[serde(rename = "EVENT_TYPE_PREEXISTING")]
    Preexisting,
    /// Entity first published
    #[serde(rename = "EVENT_TYPE_CREATED")]
    Created,
    /// Entity refreshed or changed
    #[serde(rename = "EVENT_TYPE_UPDATE")]
    Update,
    /// Entity removed by its publisher
    #[serde(rename = "EVENT_TYPE_DELETED")]
    Deleted,
    /// Entity expired on the platform
    #[serde(rename = "EVENT_TYPE_EXPIRED")]
    Expired,
    /// Unrecognized event type
    #[default]
    #[serde(other)]
    Other,
}

impl EntityEventType {
    /// Whether the event announces the entity is gone
    pub fn is_removal(&self) -> bool {
        matches!(self, EntityEventType::Deleted | EntityEventType::Expired)
    }
}

/// WGS84 position
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    /// Latitude in degrees
    pub latitude_degrees: f64,
    /// Longitude in degrees
    pub longitude_degrees: f64,
    /// Height above ellipsoid in meters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub altitude_hae_meters: Option<f64>,
}

/// East/north/up velocity components in m/s
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Enu {
    /// East
    pub e: f64,
    /// North
    pub n: f64,
    /// Up
    pub u: f64,
}

/// Kinematic state of an entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    /// Current position
    pub position: Position,
    /// Ground speed in m/s
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed_mps: Option<f64>,
    /// Velocity vector
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub velocity_enu: Option<Enu>,
}

/// Disposition and operating environment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MilView {
    /// Disposition
    #[serde(default)]
    pub disposition: Disposition,
    /// Operating environment, e.g. `ENVIRONMENT_SURFACE`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
}

/// Ontology classification
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ontology {
    /// Template (asset, track, ...)
    #[serde(default)]
    pub template: Template,
    /// Platform type, e.g. `USV`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform_type: Option<String>,
}

/// Human-facing names
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aliases {
    /// Display name
    #[serde(default)]
    pub name: String,
}

/// Origin and update time of an entity or override
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provenance {
    /// Integration that published the data
    #[serde(default)]
    pub integration_name: String,
    /// Data type label
    #[serde(default)]
    pub data_type: String,
    /// Source system identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
    /// Time the source produced this update
    pub source_update_time: DateTime<Utc>,
    /// Free-form source description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_description: Option<String>,
}

impl Provenance {
    /// Provenance for data published by this integration at `now`
    pub fn new(
        integration_name: impl Into<String>,
        data_type: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            integration_name: integration_name.into(),
            data_type: data_type.into(),
            source_id: None,
            source_update_time: now,
            source_description: None,
        }
    }

    /// Copy of this provenance restamped at `now`
    pub fn restamped(&self, now: DateTime<Utc>) -> Self {
        Self {
            source_update_time: now,
            ..self.clone()
        }
    }
}

/// Task specification an asset advertises it can execute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDefinition {
    /// Specification type URL
    pub task_specification_url: String,
}

/// Set of task definitions an asset accepts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskCatalog {
    /// Accepted definitions
    #[serde(default)]
    pub task_definitions: Vec<TaskDefinition>,
}

/// Snapshot of a tracked object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    /// Unique identifier per physical or simulated object
    pub entity_id: String,
    /// Liveness flag; `false` marks the entity as gone
    #[serde(default)]
    pub is_live: bool,
    /// Time after which the platform drops the entity unless refreshed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_time: Option<DateTime<Utc>>,
    /// Names
    #[serde(default)]
    pub aliases: Aliases,
    /// Kinematics
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    /// Disposition
    #[serde(default)]
    pub mil_view: MilView,
    /// Classification
    #[serde(default)]
    pub ontology: Ontology,
    /// Origin metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provenance: Option<Provenance>,
    /// Tasks this entity can execute
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_catalog: Option<TaskCatalog>,
}

impl Entity {
    /// Live entity with the given template and no location
    pub fn new(entity_id: impl Into<String>, template: Template) -> Self {
        Self {
            entity_id: entity_id.into(),
            is_live: true,
            expiry_time: None,
            aliases: Aliases::default(),
            location: None,
            mil_view: MilView::default(),
            ontology: Ontology {
                template,
                platform_type: None,
            },
            provenance: None,
            task_catalog: None,
        }
    }

    /// Set the surface position
    pub fn at(mut self, latitude: f64, longitude: f64) -> Self {
        let location = self.location.get_or_insert(Location {
            position: Position {
                latitude_degrees: latitude,
                longitude_degrees: longitude,
                altitude_hae_meters: None,
            },
            speed_mps: None,
            velocity_enu: None,
        });
        location.position.latitude_degrees = latitude;
        location.position.longitude_degrees = longitude;
        self
    }

    /// Set the disposition
    pub fn with_disposition(mut self, disposition: Disposition) -> Self {
        self.mil_view.disposition = disposition;
        self
    }

    /// Set the expiry time
    pub fn expiring_at(mut self, expiry: DateTime<Utc>) -> Self {
        self.expiry_time = Some(expiry);
        self
    }

    /// Set the display name
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.aliases.name = name.into();
        self
    }

    /// Set provenance
    pub fn with_provenance(mut self, provenance: Provenance) -> Self {
        self.provenance = Some(provenance);
        self
    }

    /// Ontology template
    pub fn template(&self) -> Template {
        self.ontology.template
    }

    /// Current disposition
    pub fn disposition(&self) -> Disposition {
        self.mil_view.disposition
    }

    /// Surface position, if the entity carries one
    pub fn position(&self) -> Option<GeoPoint> {
        self.location.as_ref().map(|l| {
            GeoPoint::new(l.position.latitude_degrees, l.position.longitude_degrees)
        })
    }

    /// Ground speed, if reported
    pub fn speed_mps(&self) -> Option<f64> {
        self.location.as_ref().and_then(|l| l.speed_mps)
    }

    /// Whether the entity's expiry lies at or before `now`.
    ///
    /// Entities without an expiry never expire.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiry_time.is_some_and(|expiry| expiry <= now)
    }
}

/// One entity change delivered by the platform stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityEvent {
    /// Kind of change
    #[serde(default)]
    pub event_type: EntityEventType,
    /// Entity snapshot after the change
    pub entity: Entity,
}

impl EntityEvent {
    /// Update event for `entity`
    pub fn update(entity: Entity) -> Self {
        Self {
            event_type: EntityEventType::Update,
            entity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_unknown_enum_values_decode_to_other() {
        let json = r#"{
            "entityId": "e-1",
            "isLive": true,
            "milView": { "disposition": "DISPOSITION_ASSUMED_FRIENDLY" },
            "ontology": { "template": "TEMPLATE_SIGNAL" }
        }"#;

        let entity: Entity = serde_json::from_str(json).unwrap();
        assert_eq!(entity.template(), Template::Other);
        assert_eq!(entity.disposition(), Disposition::Other);
    }

    #[test]
    fn test_decode_track_snapshot() {
        let json = r#"{
            "entityId": "track-7",
            "isLive": true,
            "expiryTime": "2026-01-01T00:00:15Z",
            "aliases": { "name": "Simulated Track" },
            "location": { "position": { "latitudeDegrees": 33.6, "longitudeDegrees": -117.9 } },
            "milView": { "disposition": "DISPOSITION_UNKNOWN", "environment": "ENVIRONMENT_SURFACE" },
            "ontology": { "template": "TEMPLATE_TRACK" },
            "provenance": {
                "integrationName": "auto-reconnaissance-sample-app",
                "dataType": "Simulated Track",
                "sourceUpdateTime": "2026-01-01T00:00:00Z"
            }
        }"#;

        let entity: Entity = serde_json::from_str(json).unwrap();
        assert_eq!(entity.template(), Template::Track);
        assert_eq!(entity.disposition(), Disposition::Unknown);
        assert_eq!(entity.position(), Some(GeoPoint::new(33.6, -117.9)));
        assert_eq!(entity.aliases.name, "Simulated Track");
    }

    #[test]
    fn test_missing_sections_default() {
        let entity: Entity = serde_json::from_str(r#"{"entityId":"bare"}"#).unwrap();
        assert!(!entity.is_live);
        assert_eq!(entity.template(), Template::Other);
        assert!(entity.position().is_none());
        assert!(!entity.is_expired(Utc::now()));
    }

    #[test]
    fn test_expiry() {
        let now = Utc::now();
        let entity = Entity::new("a", Template::Asset).expiring_at(now + Duration::seconds(15));

        assert!(!entity.is_expired(now));
        assert!(entity.is_expired(now + Duration::seconds(15)));
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Disposition::Hostile.at_least(Disposition::Suspicious));
        assert!(Disposition::Suspicious.at_least(Disposition::Suspicious));
        assert!(!Disposition::Unknown.at_least(Disposition::Suspicious));
        assert!(!Disposition::Friendly.at_least(Disposition::Unknown));
    }

    #[test]
    fn test_removal_events() {
        assert!(EntityEventType::Deleted.is_removal());
        assert!(EntityEventType::Expired.is_removal());
        assert!(!EntityEventType::Update.is_removal());
    }
}
