//! Simulation harness for AutoRecon.
//!
//! - [`InMemoryPlatform`]: the platform collaborators in process memory,
//!   with scripted faults for exercising the arbiter
//! - [`SimulatedAsset`]: friendly asset publishing itself and answering tasks
//! - [`SimulatedTrack`]: unknown track publisher

pub mod asset;
pub mod platform;
pub mod track;

pub use asset::SimulatedAsset;
pub use platform::{DispositionOverride, InMemoryPlatform, ScriptedStep, StatusUpdate};
pub use track::SimulatedTrack;
