//! Working set of known assets.
//!
//! Refreshed on every asset sighting. An asset whose expiry passes without a
//! fresh sighting drops out of matching until it is seen again.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use autorecon_core::Entity;

/// Latest snapshot per asset identifier
#[derive(Debug, Default)]
pub struct AssetRegistry {
    assets: RwLock<HashMap<String, Entity>>,
}

impl AssetRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the snapshot for an asset.
    ///
    /// Returns `true` when the asset was not previously known.
    pub fn upsert(&self, asset: Entity) -> bool {
        let mut assets = self.assets.write().unwrap_or_else(PoisonError::into_inner);
        assets.insert(asset.entity_id.clone(), asset).is_none()
    }

    /// Forget an asset
    pub fn remove(&self, asset_id: &str) -> Option<Entity> {
        let mut assets = self.assets.write().unwrap_or_else(PoisonError::into_inner);
        assets.remove(asset_id)
    }

    /// Drop every asset expired at `now`, returning their identifiers
    pub fn evict_expired(&self, now: DateTime<Utc>) -> Vec<String> {
        let mut assets = self.assets.write().unwrap_or_else(PoisonError::into_inner);
        let expired: Vec<String> = assets
            .values()
            .filter(|asset| asset.is_expired(now))
            .map(|asset| asset.entity_id.clone())
            .collect();
        for id in &expired {
            assets.remove(id);
        }
        expired
    }

    /// Unexpired assets at `now`, ordered by identifier
    pub fn snapshot(&self, now: DateTime<Utc>) -> Vec<Entity> {
        let assets = self.assets.read().unwrap_or_else(PoisonError::into_inner);
        let mut live: Vec<Entity> = assets
            .values()
            .filter(|asset| !asset.is_expired(now))
            .cloned()
            .collect();
        live.sort_by(|a, b| a.entity_id.cmp(&b.entity_id));
        live
    }

    /// Latest snapshot for one asset
    pub fn get(&self, asset_id: &str) -> Option<Entity> {
        let assets = self.assets.read().unwrap_or_else(PoisonError::into_inner);
        assets.get(asset_id).cloned()
    }

    /// Number of assets held, expired or not
    pub fn len(&self) -> usize {
        self.assets.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether no assets are held
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autorecon_core::Template;
    use chrono::Duration;

    fn asset(id: &str, expiry: DateTime<Utc>) -> Entity {
        Entity::new(id, Template::Asset).at(0.0, 0.0).expiring_at(expiry)
    }

    #[test]
    fn test_upsert_overwrites() {
        let now = Utc::now();
        let registry = AssetRegistry::new();

        assert!(registry.upsert(asset("a", now + Duration::seconds(15)).at(1.0, 1.0)));
        assert!(!registry.upsert(asset("a", now + Duration::seconds(15)).at(2.0, 2.0)));

        assert_eq!(registry.len(), 1);
        let stored = registry.get("a").unwrap();
        assert_eq!(stored.position().unwrap().latitude, 2.0);
    }

    #[test]
    fn test_snapshot_excludes_expired() {
        let now = Utc::now();
        let registry = AssetRegistry::new();
        registry.upsert(asset("stale", now - Duration::seconds(1)));
        registry.upsert(asset("fresh", now + Duration::seconds(15)));

        let snapshot = registry.snapshot(now);
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].entity_id, "fresh");
    }

    #[test]
    fn test_evict_expired() {
        let now = Utc::now();
        let registry = AssetRegistry::new();
        registry.upsert(asset("stale", now - Duration::seconds(1)));
        registry.upsert(asset("fresh", now + Duration::seconds(15)));

        let evicted = registry.evict_expired(now);
        assert_eq!(evicted, vec!["stale".to_string()]);
        assert_eq!(registry.len(), 1);

        // A new sighting re-adds the asset.
        assert!(registry.upsert(asset("stale", now + Duration::seconds(15))));
        assert_eq!(registry.snapshot(now).len(), 2);
    }

    #[test]
    fn test_snapshot_sorted_by_id() {
        let later = Utc::now() + Duration::seconds(60);
        let registry = AssetRegistry::new();
        for id in ["charlie", "alpha", "bravo"] {
            registry.upsert(asset(id, later));
        }

        let ids: Vec<String> = registry
            .snapshot(Utc::now())
            .into_iter()
            .map(|a| a.entity_id)
            .collect();
        assert_eq!(ids, vec!["alpha", "bravo", "charlie"]);
    }

    #[test]
    fn test_remove() {
        let registry = AssetRegistry::new();
        registry.upsert(Entity::new("a", Template::Asset));
        assert!(registry.remove("a").is_some());
        assert!(registry.remove("a").is_none());
        assert!(registry.is_empty());
    }
}
