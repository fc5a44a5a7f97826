//! REST client for the surveillance platform.
//!
//! [`LatticeClient`] implements the arbiter's collaborator traits over the
//! platform's `/api/v1` HTTP surface. Task status reports are obtained by
//! polling task lookups, see [`autorecon_arbiter::PollingStatusSource`].

pub mod client;
pub mod error;
pub mod wire;

pub use client::{base_url, LatticeClient, SANDBOX_AUTHORIZATION_HEADER};
pub use error::LatticeError;
