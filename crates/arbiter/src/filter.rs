//! Entity classification.
//!
//! Classification depends only on (template, disposition). Anything not
//! positively recognized lands in `Ignore`, so an unexpected value can never
//! cause tasking.

use autorecon_core::{Disposition, Entity, EntityEvent, EntityEventType, Template};

/// How the arbiter treats an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classification {
    /// Own-side resource; tracked, never tasked against
    Asset,
    /// Non-friendly track that warrants investigation
    ActionableTrack,
    /// Not relevant to arbitration
    Ignore,
}

/// Classify an entity snapshot
pub fn classify(entity: &Entity) -> Classification {
    classify_parts(entity.template(), entity.disposition())
}

/// Classify from the two fields that decide it
pub fn classify_parts(template: Template, disposition: Disposition) -> Classification {
    match (template, disposition) {
        (Template::Asset, _) => Classification::Asset,
        (
            Template::Track,
            Disposition::Hostile | Disposition::Suspicious | Disposition::Unknown,
        ) => Classification::ActionableTrack,
        _ => Classification::Ignore,
    }
}

/// Entity event tagged with its classification
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedEntity {
    pub classification: Classification,
    pub event_type: EntityEventType,
    pub entity: Entity,
}

impl ClassifiedEntity {
    /// Classify a stream event
    pub fn from_event(event: EntityEvent) -> Self {
        Self {
            classification: classify(&event.entity),
            event_type: event.event_type,
            entity: event.entity,
        }
    }

    /// Whether the event retires the entity
    pub fn is_removal(&self) -> bool {
        self.event_type.is_removal() || !self.entity.is_live
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn any_disposition() -> impl Strategy<Value = Disposition> {
        prop_oneof![
            Just(Disposition::Friendly),
            Just(Disposition::Hostile),
            Just(Disposition::Suspicious),
            Just(Disposition::Unknown),
            Just(Disposition::Other),
        ]
    }

    fn recognized_disposition() -> impl Strategy<Value = Disposition> {
        prop_oneof![
            Just(Disposition::Friendly),
            Just(Disposition::Hostile),
            Just(Disposition::Suspicious),
            Just(Disposition::Unknown),
        ]
    }

    proptest! {
        #[test]
        fn assets_always_classify_as_asset(disposition in any_disposition()) {
            prop_assert_eq!(
                classify_parts(Template::Asset, disposition),
                Classification::Asset
            );
        }

        #[test]
        fn tracks_actionable_iff_not_friendly(disposition in recognized_disposition()) {
            let actionable =
                classify_parts(Template::Track, disposition) == Classification::ActionableTrack;
            prop_assert_eq!(actionable, disposition != Disposition::Friendly);
        }

        #[test]
        fn other_templates_ignored(disposition in any_disposition()) {
            prop_assert_eq!(
                classify_parts(Template::Other, disposition),
                Classification::Ignore
            );
        }

        #[test]
        fn classification_is_deterministic(disposition in any_disposition()) {
            let entity = Entity::new("e", Template::Track).with_disposition(disposition);
            prop_assert_eq!(classify(&entity), classify(&entity.clone()));
        }
    }

    #[test]
    fn test_unrecognized_track_disposition_is_ignored() {
        let entity = Entity::new("t", Template::Track).with_disposition(Disposition::Other);
        assert_eq!(classify(&entity), Classification::Ignore);
    }

    #[test]
    fn test_friendly_track_is_ignored() {
        let entity = Entity::new("t", Template::Track).with_disposition(Disposition::Friendly);
        assert_eq!(classify(&entity), Classification::Ignore);
    }

    #[test]
    fn test_classified_removal() {
        let mut entity = Entity::new("a", Template::Asset);
        let live = ClassifiedEntity::from_event(EntityEvent::update(entity.clone()));
        assert!(!live.is_removal());

        entity.is_live = false;
        let gone = ClassifiedEntity::from_event(EntityEvent::update(entity.clone()));
        assert!(gone.is_removal());

        let deleted = ClassifiedEntity::from_event(EntityEvent {
            event_type: EntityEventType::Deleted,
            entity: Entity::new("a", Template::Asset),
        });
        assert!(deleted.is_removal());
    }
}
