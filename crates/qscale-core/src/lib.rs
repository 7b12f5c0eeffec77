//! qscale-core — shared vocabulary for the queue-driven scaler.
//!
//! Holds the per-tick observation types, the scaling decision, the
//! Redis key scheme for a (namespace, language) pair, and the
//! `ScalerConfig` loaded by the daemon.

pub mod config;
pub mod keys;
pub mod types;

pub use config::{parse_duration, ConfigError, IdleKeyShape, ScalerConfig, WorkerCountSource};
pub use keys::QueueKeys;
pub use types::*;
