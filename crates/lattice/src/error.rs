//! Client construction errors.
//!
//! Request-time failures are reported as
//! [`autorecon_arbiter::PlatformError`]; this type only covers setup.

use thiserror::Error;

/// Errors building a [`crate::LatticeClient`]
#[derive(Debug, Error)]
pub enum LatticeError {
    /// Token contains bytes not allowed in an HTTP header
    #[error("Invalid {header} token: {source}")]
    InvalidToken {
        /// Header the token was destined for
        header: &'static str,
        /// Underlying header error
        #[source]
        source: reqwest::header::InvalidHeaderValue,
    },

    /// HTTP client could not be initialized
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}
