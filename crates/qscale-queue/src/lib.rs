//! qscale-queue — everything the scaler reads from the shared queue store.
//!
//! # Architecture
//!
//! ```text
//! QueueStore (trait)
//!   ├── RedisQueueStore   ← production backend (LLEN / SMEMBERS / SREM / DEL)
//!   └── MemoryQueueStore  ← in-process backend for tests
//!
//! QueueInspector      → depth(stage), snapshot()
//! IdleWorkerRegistry  → read_candidates(), remove(), clear()
//! ```
//!
//! A missing list key reads as length zero. An unreachable store is a
//! `StoreError`, never a zero.

pub mod error;
pub mod idle;
pub mod inspector;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use idle::IdleWorkerRegistry;
pub use inspector::QueueInspector;
pub use store::{MemoryQueueStore, QueueStore, RedisQueueStore};
