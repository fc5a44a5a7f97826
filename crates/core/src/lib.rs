//! Core functionality for the AutoRecon reconnaissance arbiter.
//!
//! This crate provides the data model shared by the arbiter, the platform
//! client and the simulators, plus configuration, logging and geo utilities.

pub mod config;
pub mod entity;
pub mod error;
pub mod geo;
pub mod logging;
pub mod task;

pub use config::{
    config_path_from_args, ArbiterSettings, Config, LoggingConfig, SimulationSettings,
};
pub use entity::{
    Aliases, Disposition, Entity, EntityEvent, EntityEventType, Enu, Location, MilView, Ontology,
    Position, Provenance, TaskCatalog, TaskDefinition, Template,
};
pub use error::{CoreError, Result};
pub use geo::{distance, GeoPoint};
pub use task::{
    AgentRequest, StatusEvent, Task, TaskId, TaskRequest, TaskStatus, INVESTIGATE_SPECIFICATION,
};

/// Integration name stamped on provenance published by this system
pub const INTEGRATION_NAME: &str = "auto-reconnaissance-sample-app";
