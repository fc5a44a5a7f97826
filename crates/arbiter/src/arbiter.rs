//! Arbiter runtime.
//!
//! Wires the three long-lived workers together:
//!
//! ```text
//! EntityStreamReader --(bounded mpsc)--> TaskDispatcher
//!                                              |
//!                                   TaskLifecycleTracker <-- StatusListener
//! ```
//!
//! All workers share one cancellation token. Any worker ending, normally or
//! by panic, cancels the token so the others wind down with it.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use autorecon_core::ArbiterSettings;

use crate::dispatcher::TaskDispatcher;
use crate::error::ArbiterError;
use crate::filter::ClassifiedEntity;
use crate::lifecycle::TaskLifecycleTracker;
use crate::platform::Collaborators;
use crate::status::StatusListener;
use crate::stream::{ConnectionState, EntityStreamReader, ReaderMetrics, ReaderSettings};

/// Autonomous arbitration loop
pub struct Arbiter {
    reader: EntityStreamReader,
    dispatcher: TaskDispatcher,
    listener: StatusListener,
    tracker: Arc<TaskLifecycleTracker>,
    channel_capacity: usize,
    shutdown: CancellationToken,
}

impl Arbiter {
    /// Build an arbiter with a fresh lifecycle tracker
    pub fn new(collaborators: Collaborators, settings: &ArbiterSettings) -> Self {
        Self::with_tracker(
            collaborators,
            settings,
            Arc::new(TaskLifecycleTracker::new()),
        )
    }

    /// Build an arbiter around an existing tracker.
    ///
    /// Needed when the status source itself reads the tracker, as
    /// [`crate::status::PollingStatusSource`] does.
    pub fn with_tracker(
        collaborators: Collaborators,
        settings: &ArbiterSettings,
        tracker: Arc<TaskLifecycleTracker>,
    ) -> Self {
        let Collaborators {
            events,
            entities,
            tasks,
            statuses,
        } = collaborators;

        Self {
            reader: EntityStreamReader::new(events, ReaderSettings::from(settings)),
            dispatcher: TaskDispatcher::new(tasks, entities, Arc::clone(&tracker)),
            listener: StatusListener::new(
                statuses,
                Arc::clone(&tracker),
                settings.status_backoff(),
            ),
            tracker,
            channel_capacity: settings.channel_capacity.max(1),
            shutdown: CancellationToken::new(),
        }
    }

    /// Token that stops the arbiter when cancelled
    pub fn shutdown_handle(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Task lifecycle state shared by the workers
    pub fn tracker(&self) -> Arc<TaskLifecycleTracker> {
        Arc::clone(&self.tracker)
    }

    /// Observe the entity stream connection state
    pub fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.reader.subscribe_state()
    }

    /// Entity stream counters
    pub fn reader_metrics(&self) -> Arc<ReaderMetrics> {
        self.reader.metrics()
    }

    /// Run every worker until shutdown.
    ///
    /// Returns the first abnormal worker termination, if any.
    pub async fn run(self) -> Result<(), ArbiterError> {
        let Arbiter {
            reader,
            dispatcher,
            listener,
            channel_capacity,
            shutdown,
            ..
        } = self;

        info!(channel_capacity, "starting arbiter");

        let (tx, rx) = mpsc::channel(channel_capacity);
        let workers = [
            supervise("entity-stream", reader.run(tx, shutdown.clone()), &shutdown),
            supervise(
                "task-dispatcher",
                dispatch_loop(dispatcher, rx, shutdown.clone()),
                &shutdown,
            ),
            supervise("status-listener", listener.run(shutdown.clone()), &shutdown),
        ];

        let mut first_failure = None;
        for (worker, handle) in workers {
            if let Err(e) = handle.await {
                error!(worker, error = %e, "arbiter worker failed");
                first_failure.get_or_insert(ArbiterError::WorkerFailed {
                    worker,
                    reason: e.to_string(),
                });
            }
        }

        info!("arbiter stopped");
        first_failure.map_or(Ok(()), Err)
    }
}

fn supervise<F>(
    worker: &'static str,
    future: F,
    shutdown: &CancellationToken,
) -> (&'static str, JoinHandle<()>)
where
    F: Future<Output = ()> + Send + 'static,
{
    let guard = shutdown.clone().drop_guard();
    let handle = tokio::spawn(async move {
        let _guard = guard;
        future.await;
    });
    (worker, handle)
}

async fn dispatch_loop(
    dispatcher: TaskDispatcher,
    mut rx: mpsc::Receiver<ClassifiedEntity>,
    shutdown: CancellationToken,
) {
    info!("starting task dispatcher");

    loop {
        let next = tokio::select! {
            _ = shutdown.cancelled() => break,
            next = rx.recv() => next,
        };
        let Some(classified) = next else { break };

        // A task created but not yet recorded is lost here; the next sighting re-derives it.
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = dispatcher.handle(classified) => {}
        }
    }

    info!("task dispatcher stopped");
}
