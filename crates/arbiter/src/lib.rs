//! Arbiter - autonomous reconnaissance tasking for AutoRecon
//!
//! This crate holds the arbitration loop that pairs hostile or unidentified
//! tracks with the nearest friendly asset. It handles:
//! - Entity classification (assets, actionable tracks, everything else)
//! - Nearest-asset selection by great-circle distance
//! - Task creation with at most one in-flight task per track
//! - Task lifecycle tracking with versioned, idempotent status updates
//! - Entity stream supervision with fixed reconnect backoff
//!
//! # Architecture
//!
//! Entities flow through the following pipeline:
//! 1. Events received from the platform by `EntityStreamReader`
//! 2. Events classified and filtered by `filter::classify`
//! 3. Assets kept in `AssetRegistry`, tracks handed to `TaskDispatcher`
//! 4. Nearest asset chosen by `proximity::select_asset` and tasked
//! 5. Status reports applied to `TaskLifecycleTracker` by `StatusListener`
//!
//! The platform itself is reached through the traits in [`platform`].
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//! use autorecon_arbiter::{Arbiter, Collaborators, EntityEventSource, EntityApi, TaskApi, StatusEventSource};
//! use autorecon_core::ArbiterSettings;
//!
//! async fn run<P>(platform: Arc<P>) -> Result<(), autorecon_arbiter::ArbiterError>
//! where
//!     P: EntityEventSource + EntityApi + TaskApi + StatusEventSource + 'static,
//! {
//!     let arbiter = Arbiter::new(Collaborators::from_platform(platform), &ArbiterSettings::default());
//!     let shutdown = arbiter.shutdown_handle();
//!     tokio::spawn(async move {
//!         let _ = tokio::signal::ctrl_c().await;
//!         shutdown.cancel();
//!     });
//!     arbiter.run().await
//! }
//! ```

#![warn(missing_docs)]

pub mod arbiter;
pub mod dispatcher;
pub mod error;
pub mod filter;
pub mod lifecycle;
pub mod platform;
pub mod proximity;
pub mod registry;
pub mod status;
pub mod stream;

// Re-export commonly used types
pub use arbiter::Arbiter;
pub use dispatcher::{DispatchOutcome, TaskDispatcher, OVERRIDE_DISPOSITION};
pub use error::{ArbiterError, LifecycleError, PlatformError};
pub use filter::{classify, Classification, ClassifiedEntity};
pub use lifecycle::TaskLifecycleTracker;
pub use platform::{
    AgentApi, Collaborators, EntityApi, EntityEventSource, PollOutcome, StatusEventSource,
    TaskApi,
};
pub use proximity::{select_asset, AssetMatch};
pub use registry::AssetRegistry;
pub use status::{apply_status_event, PollingStatusSource, StatusListener, StatusOutcome};
pub use stream::{ConnectionState, EntityStreamReader, ReaderMetrics, ReaderSettings};
