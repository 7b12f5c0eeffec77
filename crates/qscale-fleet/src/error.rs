//! Orchestrator error types.

use thiserror::Error;

/// Result type alias for orchestrator calls.
pub type FleetResult<T> = Result<T, FleetError>;

/// An orchestrator call failed or its answer is unknown.
#[derive(Debug, Error)]
pub enum FleetError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("orchestrator returned {status} for {method} {path}: {message}")]
    Api {
        method: &'static str,
        path: String,
        status: u16,
        message: String,
    },

    #[error("orchestrator unavailable")]
    Unavailable,
}
