//! Nearest-asset selection.
//!
//! Assets are ranked by great-circle surface distance to the track, altitude
//! ignored. Equal distances resolve to the lexicographically smallest asset
//! identifier so repeated runs pick the same asset.

use std::cmp::Ordering;

use autorecon_core::{distance, Entity};

/// Asset chosen for a track
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AssetMatch<'a> {
    /// Selected asset snapshot
    pub asset: &'a Entity,
    /// Surface distance from asset to track in meters
    pub distance_m: f64,
}

impl AssetMatch<'_> {
    /// Identifier of the selected asset
    pub fn asset_id(&self) -> &str {
        &self.asset.entity_id
    }
}

/// Select the asset nearest to `track`.
///
/// Returns `None` when no asset with a position is available, or when the
/// track itself has no position. That is a normal outcome, not a failure.
pub fn select_asset<'a, I>(track: &Entity, assets: I) -> Option<AssetMatch<'a>>
where
    I: IntoIterator<Item = &'a Entity>,
{
    let target = track.position()?;

    assets
        .into_iter()
        .filter_map(|asset| {
            let position = asset.position()?;
            let distance_m = distance(position, target);
            (!distance_m.is_nan()).then_some(AssetMatch { asset, distance_m })
        })
        .min_by(compare)
}

fn compare(a: &AssetMatch<'_>, b: &AssetMatch<'_>) -> Ordering {
    a.distance_m
        .total_cmp(&b.distance_m)
        .then_with(|| a.asset_id().cmp(b.asset_id()))
}
