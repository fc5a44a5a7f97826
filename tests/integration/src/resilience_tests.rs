//! Fault handling scenarios
//!
//! - Stream faults back off for the fixed interval and reconnect
//! - Failed task creation leaves no state, so the next sighting retries
//! - Failed disposition overrides never undo a created task
//! - Status reports survive listener faults, duplicates and unknown tasks

use std::sync::Arc;
use tokio::time::{Duration, Instant};

use autorecon_arbiter::{ConnectionState, EntityApi, ReaderMetrics, TaskApi};
use autorecon_core::{Disposition, Entity, TaskRequest, TaskStatus, Template};
use autorecon_sim::{InMemoryPlatform, ScriptedStep, SimulatedAsset};

use crate::test_utils::{asset, fast_settings, settle, track, wait_until, Harness};

#[tokio::test(start_paused = true)]
async fn test_stream_fault_reconnects_after_backoff() {
    let platform = Arc::new(InMemoryPlatform::new());
    platform.script_entity_stream(ScriptedStep::Fault("connection reset".into()));
    let started = Instant::now();
    let harness = Harness::start_on(platform.clone(), fast_settings());

    settle().await;
    assert_eq!(harness.connection_state(), ConnectionState::Disconnected);
    assert_eq!(ReaderMetrics::get(&harness.metrics.faults), 1);

    platform.publish_entity(&asset("asset-01", 0.0, 0.0)).await.unwrap();
    platform
        .publish_entity(&track("track-01", 0.5, 0.5, Disposition::Hostile))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_secs(20)).await;
    assert!(platform.task_requests().is_empty());
    assert_eq!(platform.connects(), 1);

    wait_until("task after reconnect", || !platform.task_requests().is_empty()).await;
    assert!(started.elapsed() >= Duration::from_secs(30));
    assert_eq!(platform.connects(), 2);
    assert_eq!(harness.connection_state(), ConnectionState::Streaming);

    harness.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_stream_timeouts_are_not_faults() {
    let platform = Arc::new(InMemoryPlatform::with_long_poll_timeout(Duration::from_secs(2)));
    platform.script_entity_stream(ScriptedStep::Timeout);
    let harness = Harness::start_on(platform.clone(), fast_settings());

    tokio::time::sleep(Duration::from_secs(10)).await;

    assert_eq!(platform.connects(), 1);
    assert_eq!(ReaderMetrics::get(&harness.metrics.faults), 0);
    assert!(ReaderMetrics::get(&harness.metrics.timeouts) >= 4);
    assert_eq!(harness.connection_state(), ConnectionState::Streaming);

    harness.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_during_backoff() {
    let platform = Arc::new(InMemoryPlatform::new());
    platform.script_entity_stream(ScriptedStep::Fault("connection reset".into()));
    let harness = Harness::start_on(platform.clone(), fast_settings());
    settle().await;

    let stopping = Instant::now();
    let state = harness.state.clone();
    harness.stop().await.unwrap();

    assert!(stopping.elapsed() < Duration::from_secs(30));
    assert_eq!(*state.borrow(), ConnectionState::Disconnected);
    assert_eq!(platform.connects(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_creation_failure_retried_on_next_sighting() {
    let harness = Harness::start();
    let platform = harness.platform.clone();
    platform.fail_next_create("HTTP 503");

    platform.publish_entity(&asset("asset-01", 0.0, 0.0)).await.unwrap();
    platform
        .publish_entity(&track("track-01", 0.5, 0.5, Disposition::Unknown))
        .await
        .unwrap();
    settle().await;

    assert!(platform.task_requests().is_empty());
    assert!(harness.tracker.is_empty());
    assert!(platform.overrides().is_empty());

    platform
        .publish_entity(&track("track-01", 0.5, 0.5, Disposition::Unknown))
        .await
        .unwrap();
    settle().await;

    assert_eq!(platform.task_requests().len(), 1);
    assert!(harness.tracker.in_flight_for("track-01").is_some());

    harness.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_override_failure_keeps_task() {
    let harness = Harness::start();
    let platform = harness.platform.clone();
    platform.fail_next_override("HTTP 500");

    platform.publish_entity(&asset("asset-01", 0.0, 0.0)).await.unwrap();
    platform
        .publish_entity(&track("track-01", 0.5, 0.5, Disposition::Unknown))
        .await
        .unwrap();
    settle().await;

    let task_id = harness.tracker.in_flight_for("track-01").unwrap();
    assert_eq!(harness.tracker.status(&task_id), Some((TaskStatus::Created, 0)));
    assert!(platform.overrides().is_empty());
    assert_eq!(
        platform.entity("track-01").unwrap().disposition(),
        Disposition::Unknown
    );

    // Later sightings do not retry the override nor duplicate the task.
    platform
        .publish_entity(&track("track-01", 0.5, 0.5, Disposition::Unknown))
        .await
        .unwrap();
    settle().await;
    assert_eq!(platform.task_requests().len(), 1);

    harness.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_status_listener_backs_off_and_recovers() {
    let platform = Arc::new(InMemoryPlatform::new());
    platform.script_status_stream(ScriptedStep::Fault("connection reset".into()));
    let harness = Harness::start_on(platform.clone(), fast_settings());

    let sim_asset = SimulatedAsset::new(
        "asset-01",
        (0.0, 0.0),
        platform.clone(),
        platform.clone(),
        platform.clone(),
    );
    let sims = tokio_util::sync::CancellationToken::new();
    tokio::spawn(sim_asset.run(sims.clone()));
    settle().await;

    platform
        .publish_entity(&track("track-01", 0.5, 0.5, Disposition::Unknown))
        .await
        .unwrap();

    let tracker = harness.tracker.clone();
    wait_until("task executing", || {
        tracker
            .in_flight_for("track-01")
            .is_some_and(|id| tracker.is_executing(&id).unwrap_or(false))
    })
    .await;

    sims.cancel();
    harness.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_and_stale_reports_are_idempotent() {
    let harness = Harness::start();
    let platform = harness.platform.clone();

    platform.publish_entity(&asset("asset-01", 0.0, 0.0)).await.unwrap();
    platform
        .publish_entity(&track("track-01", 0.5, 0.5, Disposition::Unknown))
        .await
        .unwrap();
    settle().await;
    let task_id = harness.tracker.in_flight_for("track-01").unwrap();

    for (status, version) in [
        (TaskStatus::Executing, 2),
        (TaskStatus::Executing, 2),
        (TaskStatus::Created, 1),
        (TaskStatus::Executing, 2),
    ] {
        platform
            .update_task_status(&task_id, status, version, "asset-01")
            .await
            .unwrap();
    }
    settle().await;

    assert_eq!(
        harness.tracker.status(&task_id),
        Some((TaskStatus::Executing, 2))
    );
    assert!(harness.tracker.is_executing(&task_id).unwrap());

    harness.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_reports_for_foreign_tasks_are_dropped() {
    let harness = Harness::start();
    let platform = harness.platform.clone();

    // Task created by someone else on the platform, never recorded here.
    let foreign = platform
        .create_task(&TaskRequest::investigate(
            &Entity::new("asset-09", Template::Asset),
            &Entity::new("track-09", Template::Track),
        ))
        .await
        .unwrap();
    platform
        .update_task_status(&foreign, TaskStatus::Executing, 1, "asset-09")
        .await
        .unwrap();
    settle().await;

    assert!(harness.tracker.is_empty());
    assert!(!harness.tracker.is_retired(&foreign));

    // The listener keeps running.
    platform.publish_entity(&asset("asset-01", 0.0, 0.0)).await.unwrap();
    platform
        .publish_entity(&track("track-01", 0.5, 0.5, Disposition::Unknown))
        .await
        .unwrap();
    settle().await;
    let task_id = harness.tracker.in_flight_for("track-01").unwrap();
    platform
        .update_task_status(&task_id, TaskStatus::DoneOk, 1, "asset-01")
        .await
        .unwrap();
    settle().await;
    assert!(harness.tracker.is_retired(&task_id));

    harness.stop().await.unwrap();
}
