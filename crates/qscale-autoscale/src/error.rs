//! Control loop error types.

use std::time::Duration;

use qscale_fleet::FleetError;
use qscale_queue::StoreError;
use thiserror::Error;

/// Why a tick could not reach a decision.
#[derive(Debug, Error)]
pub enum TickError {
    #[error("queue store error: {0}")]
    Store(#[from] StoreError),

    #[error("orchestrator error: {0}")]
    Fleet(#[from] FleetError),

    #[error("{call} timed out after {after:?}")]
    Timeout { call: &'static str, after: Duration },
}
