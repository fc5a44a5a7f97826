//! Test utilities for arbiter integration tests

use chrono::{Duration as ChronoDuration, Utc};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

use autorecon_arbiter::{
    Arbiter, ArbiterError, Collaborators, ConnectionState, ReaderMetrics, TaskLifecycleTracker,
};
use autorecon_core::{ArbiterSettings, Disposition, Entity, Template};
use autorecon_sim::InMemoryPlatform;

/// Install a test-friendly subscriber once; later calls are no-ops
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Arbiter settings with a short poll interval and the production backoffs
pub fn fast_settings() -> ArbiterSettings {
    ArbiterSettings {
        entity_update_rate_ms: 10,
        ..ArbiterSettings::default()
    }
}

/// Live asset valid for a minute of wall-clock time
pub fn asset(id: &str, latitude: f64, longitude: f64) -> Entity {
    Entity::new(id, Template::Asset)
        .at(latitude, longitude)
        .expiring_at(Utc::now() + ChronoDuration::seconds(60))
}

/// Live track with the given disposition
pub fn track(id: &str, latitude: f64, longitude: f64, disposition: Disposition) -> Entity {
    Entity::new(id, Template::Track)
        .at(latitude, longitude)
        .with_disposition(disposition)
}

/// Let every runnable task make progress
pub async fn settle() {
    tokio::time::sleep(Duration::from_secs(1)).await;
}

/// Poll `condition` every 100ms of (virtual) time, panicking after a minute
pub async fn wait_until(description: &str, mut condition: impl FnMut() -> bool) {
    for _ in 0..600 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    panic!("timed out waiting for {description}");
}

/// Running arbiter wired to an in-memory platform
pub struct Harness {
    pub platform: Arc<InMemoryPlatform>,
    pub tracker: Arc<TaskLifecycleTracker>,
    pub state: watch::Receiver<ConnectionState>,
    pub metrics: Arc<ReaderMetrics>,
    shutdown: CancellationToken,
    handle: JoinHandle<Result<(), ArbiterError>>,
}

impl Harness {
    /// Start against a fresh platform
    pub fn start() -> Self {
        Self::start_on(Arc::new(InMemoryPlatform::new()), fast_settings())
    }

    /// Start against a prepared platform
    pub fn start_on(platform: Arc<InMemoryPlatform>, settings: ArbiterSettings) -> Self {
        init_test_logging();

        let arbiter = Arbiter::new(Collaborators::from_platform(platform.clone()), &settings);
        let tracker = arbiter.tracker();
        let state = arbiter.connection_state();
        let metrics = arbiter.reader_metrics();
        let shutdown = arbiter.shutdown_handle();
        let handle = tokio::spawn(arbiter.run());

        Self {
            platform,
            tracker,
            state,
            metrics,
            shutdown,
            handle,
        }
    }

    /// Current stream connection state
    pub fn connection_state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Cancel and wait for the arbiter to exit
    pub async fn stop(self) -> Result<(), ArbiterError> {
        self.shutdown.cancel();
        match self.handle.await {
            Ok(result) => result,
            Err(e) => panic!("arbiter task failed: {e}"),
        }
    }
}
