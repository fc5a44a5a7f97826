//! Integration tests for the arbitration loop
//!
//! This test suite validates, over the in-memory platform:
//! - One task per track across repeated sightings
//! - Nearest-asset tasking and disposition escalation
//! - The full loop with a simulated asset confirming and cancelling tasks
//! - Recovery from stream faults, failed task creation and failed overrides

pub mod test_utils;

#[cfg(test)]
mod arbitration_tests;

#[cfg(test)]
mod resilience_tests;
