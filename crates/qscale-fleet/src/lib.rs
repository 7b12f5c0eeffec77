//! qscale-fleet — the worker pool as seen through the orchestrator.
//!
//! # Architecture
//!
//! ```text
//! Orchestrator (trait)
//!   ├── MarathonClient      ← REST client for /v2/apps and /v2/deployments
//!   └── MemoryOrchestrator  ← in-process fleet for tests
//!
//! FleetController
//!   ├── worker_count() / has_active_deployment() / fleet_state()
//!   ├── cancel_active_deployments()   best-effort
//!   ├── set_scale(target)
//!   └── evict(candidates, limit, idle registry) → killed
//! ```

pub mod controller;
pub mod error;
pub mod marathon;
pub mod memory;

pub use controller::FleetController;
pub use error::{FleetError, FleetResult};
pub use marathon::{AppInfo, DeploymentRef, MarathonClient, Orchestrator};
pub use memory::MemoryOrchestrator;
