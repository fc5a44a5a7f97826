//! Entity stream reader.
//!
//! Connection state machine:
//!
//! ```text
//! DISCONNECTED -> CONNECTING -> STREAMING -> (STREAMING on next event)
//!       ^                            |
//!       +------ fault + backoff -----+
//! ```
//!
//! Transport faults are logged, followed by a fixed backoff and a fresh
//! connection. Long-poll timeouts are reissued silently. Only the shutdown
//! token ends the loop.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use autorecon_core::ArbiterSettings;

use crate::error::PlatformError;
use crate::filter::{Classification, ClassifiedEntity};
use crate::platform::{EntityEventSource, PollOutcome};

/// Connection status of the entity stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No session; waiting out the backoff or stopped
    Disconnected,
    /// Opening a session
    Connecting,
    /// Session open, events flowing
    Streaming,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConnectionState::Disconnected => "DISCONNECTED",
            ConnectionState::Connecting => "CONNECTING",
            ConnectionState::Streaming => "STREAMING",
        };
        f.write_str(label)
    }
}

/// Timing for the reader loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaderSettings {
    /// Pause between successive polls
    pub poll_interval: Duration,
    /// Fixed delay between a fault and the next connection attempt
    pub backoff: Duration,
}

impl Default for ReaderSettings {
    fn default() -> Self {
        Self::from(&ArbiterSettings::default())
    }
}

impl From<&ArbiterSettings> for ReaderSettings {
    fn from(settings: &ArbiterSettings) -> Self {
        Self {
            poll_interval: settings.entity_update_rate(),
            backoff: settings.stream_backoff(),
        }
    }
}

/// Counters exported by the reader
#[derive(Debug, Default)]
pub struct ReaderMetrics {
    /// Sessions successfully opened
    pub connects: AtomicU64,
    /// Transport faults observed
    pub faults: AtomicU64,
    /// Long-poll waits that expired empty
    pub timeouts: AtomicU64,
    /// Classified entities handed to the consumer
    pub forwarded: AtomicU64,
    /// Entities dropped as irrelevant
    pub ignored: AtomicU64,
}

impl ReaderMetrics {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Read a counter
    pub fn get(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }
}

enum SessionEnd {
    Shutdown,
    ConsumerClosed,
    Fault(PlatformError),
}

/// Long-lived consumer of the platform entity stream
pub struct EntityStreamReader {
    source: Arc<dyn EntityEventSource>,
    settings: ReaderSettings,
    state_tx: watch::Sender<ConnectionState>,
    metrics: Arc<ReaderMetrics>,
}

impl EntityStreamReader {
    /// Create a reader over `source`
    pub fn new(source: Arc<dyn EntityEventSource>, settings: ReaderSettings) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            source,
            settings,
            state_tx,
            metrics: Arc::new(ReaderMetrics::default()),
        }
    }

    /// Observe connection state transitions
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    /// Current connection state
    pub fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    /// Shared counters
    pub fn metrics(&self) -> Arc<ReaderMetrics> {
        Arc::clone(&self.metrics)
    }

    fn transition(&self, next: ConnectionState) {
        let previous = self.state_tx.send_replace(next);
        if previous != next {
            debug!(from = %previous, to = %next, "entity stream state transition");
        }
    }

    /// Run until `shutdown` fires or the consumer drops its receiver.
    ///
    /// Relevant entities (assets and actionable tracks) are forwarded to
    /// `sink` in stream order; everything else is dropped here.
    pub async fn run(self, sink: mpsc::Sender<ClassifiedEntity>, shutdown: CancellationToken) {
        info!("starting entity stream reader");

        loop {
            self.transition(ConnectionState::Connecting);

            let connected = tokio::select! {
                _ = shutdown.cancelled() => break,
                result = self.source.connect() => result,
            };

            let end = match connected {
                Ok(()) => {
                    ReaderMetrics::bump(&self.metrics.connects);
                    self.transition(ConnectionState::Streaming);
                    self.stream(&sink, &shutdown).await
                }
                Err(e) => SessionEnd::Fault(e),
            };

            match end {
                SessionEnd::Shutdown => break,
                SessionEnd::ConsumerClosed => {
                    warn!("entity consumer closed, stopping stream reader");
                    break;
                }
                SessionEnd::Fault(e) => {
                    ReaderMetrics::bump(&self.metrics.faults);
                    error!(error = %e, backoff_secs = self.settings.backoff.as_secs_f64(), "lattice api stream entities error");
                    self.transition(ConnectionState::Disconnected);

                    let resumed = tokio::select! {
                        _ = shutdown.cancelled() => false,
                        _ = tokio::time::sleep(self.settings.backoff) => true,
                    };
                    if !resumed {
                        break;
                    }
                }
            }
        }

        self.transition(ConnectionState::Disconnected);
        info!("entity stream reader stopped");
    }

    async fn stream(
        &self,
        sink: &mpsc::Sender<ClassifiedEntity>,
        shutdown: &CancellationToken,
    ) -> SessionEnd {
        loop {
            let polled = tokio::select! {
                _ = shutdown.cancelled() => return SessionEnd::Shutdown,
                result = self.source.poll_events() => result,
            };

            match polled {
                Ok(PollOutcome::Ready(events)) => {
                    for event in events {
                        let classified = ClassifiedEntity::from_event(event);
                        if classified.classification == Classification::Ignore {
                            ReaderMetrics::bump(&self.metrics.ignored);
                            trace!(entity_id = %classified.entity.entity_id, "ignoring entity");
                            continue;
                        }

                        tokio::select! {
                            _ = shutdown.cancelled() => return SessionEnd::Shutdown,
                            sent = sink.send(classified) => {
                                if sent.is_err() {
                                    return SessionEnd::ConsumerClosed;
                                }
                                ReaderMetrics::bump(&self.metrics.forwarded);
                            }
                        }
                    }
                }
                Ok(PollOutcome::TimedOut) => {
                    ReaderMetrics::bump(&self.metrics.timeouts);
                    trace!("entity long poll timed out, reissuing");
                    continue;
                }
                Err(e) => return SessionEnd::Fault(e),
            }

            tokio::select! {
                _ = shutdown.cancelled() => return SessionEnd::Shutdown,
                _ = tokio::time::sleep(self.settings.poll_interval) => {}
            }
        }
    }
}
