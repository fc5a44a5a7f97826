//! Arbitration scenarios
//!
//! 1. **Repeated sightings**: a track seen many times gets exactly one task
//! 2. **Nearest asset**: the closest unexpired asset is the one tasked
//! 3. **Full loop**: a simulated asset confirms, is cancelled, and the track is re-tasked
//! 4. **Filtering**: friendly tracks and foreign templates never produce tasks
//! 5. **Escalation**: tasked tracks become SUSPICIOUS unless already HOSTILE

use std::sync::Arc;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

use autorecon_arbiter::{ConnectionState, EntityApi, ReaderMetrics};
use autorecon_core::{Disposition, Entity, TaskStatus, Template};
use autorecon_sim::{InMemoryPlatform, SimulatedAsset, SimulatedTrack};

use crate::test_utils::{asset, fast_settings, settle, track, wait_until, Harness};

#[tokio::test(start_paused = true)]
async fn test_repeated_sightings_create_one_task() {
    let harness = Harness::start();
    let platform = harness.platform.clone();

    platform.publish_entity(&asset("asset-01", 0.0, 0.0)).await.unwrap();
    for _ in 0..5 {
        platform
            .publish_entity(&track("track-01", 0.5, 0.5, Disposition::Unknown))
            .await
            .unwrap();
        settle().await;
    }

    assert_eq!(harness.connection_state(), ConnectionState::Streaming);
    assert_eq!(platform.task_requests().len(), 1);
    assert_eq!(harness.tracker.len(), 1);

    let overrides = platform.overrides();
    assert_eq!(overrides.len(), 1);
    assert_eq!(overrides[0].entity_id, "track-01");
    assert_eq!(overrides[0].disposition, Disposition::Suspicious);

    harness.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_nearest_asset_is_tasked() {
    let harness = Harness::start();
    let platform = harness.platform.clone();

    platform.publish_entity(&asset("asset-far", 10.0, 10.0)).await.unwrap();
    platform.publish_entity(&asset("asset-near", 0.0, 0.0)).await.unwrap();
    settle().await;
    platform
        .publish_entity(&track("track-01", 1.0, 1.0, Disposition::Hostile))
        .await
        .unwrap();
    settle().await;

    let requests = platform.task_requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].assignee_id, "asset-near");
    assert_eq!(requests[0].objective_id, "track-01");
    assert_eq!(requests[0].display_name, "Asset asset-near -> Track track-01");

    harness.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_track_without_assets_waits_for_one() {
    let harness = Harness::start();
    let platform = harness.platform.clone();

    platform
        .publish_entity(&track("track-01", 1.0, 1.0, Disposition::Suspicious))
        .await
        .unwrap();
    settle().await;
    assert!(platform.task_requests().is_empty());

    platform.publish_entity(&asset("asset-01", 0.0, 0.0)).await.unwrap();
    platform
        .publish_entity(&track("track-01", 1.0, 1.0, Disposition::Suspicious))
        .await
        .unwrap();
    settle().await;
    assert_eq!(platform.task_requests().len(), 1);

    harness.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_full_loop_with_simulated_asset() {
    let harness = Harness::start();
    let platform = harness.platform.clone();
    let sims = CancellationToken::new();

    let sim_asset = SimulatedAsset::new(
        "asset-01",
        (37.0, -122.0),
        platform.clone(),
        platform.clone(),
        platform.clone(),
    );
    tokio::spawn(sim_asset.run(sims.clone()));
    settle().await;

    let sim_track = SimulatedTrack::with_id("track-01", (37.01, -122.01), platform.clone());
    tokio::spawn(sim_track.run(sims.clone()));

    let tracker = harness.tracker.clone();
    wait_until("task executing", || {
        tracker
            .in_flight_for("track-01")
            .is_some_and(|id| tracker.is_executing(&id).unwrap_or(false))
    })
    .await;

    let first = tracker.in_flight_for("track-01").unwrap();
    assert_eq!(tracker.status(&first), Some((TaskStatus::Executing, 1)));
    assert_eq!(platform.task(&first).unwrap().assignee_id, "asset-01");

    platform.cancel_task(&first).unwrap();
    wait_until("cancellation tracked", || tracker.is_retired(&first)).await;
    assert!(!tracker.is_executing(&first).unwrap());

    // The track keeps refreshing, so it is picked up again once the first task ended.
    wait_until("track re-tasked", || {
        tracker
            .in_flight_for("track-01")
            .is_some_and(|id| id != first)
    })
    .await;
    assert_eq!(platform.task_requests().len(), 2);

    sims.cancel();
    harness.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_irrelevant_entities_ignored() {
    let harness = Harness::start();
    let platform = harness.platform.clone();

    platform.publish_entity(&asset("asset-01", 0.0, 0.0)).await.unwrap();
    platform
        .publish_entity(&track("friendly", 0.1, 0.1, Disposition::Friendly))
        .await
        .unwrap();
    let mut sensor = Entity::new("sensor", Template::Other).at(0.2, 0.2);
    sensor.mil_view.disposition = Disposition::Hostile;
    platform.publish_entity(&sensor).await.unwrap();
    settle().await;

    assert!(platform.task_requests().is_empty());
    assert_eq!(ReaderMetrics::get(&harness.metrics.ignored), 2);
    assert_eq!(ReaderMetrics::get(&harness.metrics.forwarded), 1);

    harness.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_hostile_track_not_overridden() {
    let harness = Harness::start();
    let platform = harness.platform.clone();

    platform.publish_entity(&asset("asset-01", 0.0, 0.0)).await.unwrap();
    platform
        .publish_entity(&track("track-01", 0.5, 0.5, Disposition::Hostile))
        .await
        .unwrap();
    settle().await;

    assert_eq!(platform.task_requests().len(), 1);
    assert!(platform.overrides().is_empty());
    assert_eq!(
        platform.entity("track-01").unwrap().disposition(),
        Disposition::Hostile
    );

    harness.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_removed_asset_not_tasked() {
    let harness = Harness::start();
    let platform = harness.platform.clone();

    platform.publish_entity(&asset("asset-01", 0.0, 0.0)).await.unwrap();
    settle().await;
    platform.delete_entity("asset-01");
    settle().await;

    platform
        .publish_entity(&track("track-01", 0.5, 0.5, Disposition::Unknown))
        .await
        .unwrap();
    settle().await;

    assert!(platform.task_requests().is_empty());
    harness.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_existing_entities_seen_on_connect() {
    let platform = Arc::new(InMemoryPlatform::new());
    platform.publish_entity(&asset("asset-01", 0.0, 0.0)).await.unwrap();
    platform
        .publish_entity(&track("track-01", 0.5, 0.5, Disposition::Unknown))
        .await
        .unwrap();

    let harness = Harness::start_on(platform.clone(), fast_settings());
    tokio::time::sleep(Duration::from_millis(500)).await;

    assert_eq!(platform.task_requests().len(), 1);
    harness.stop().await.unwrap();
}
