//! Observation and decision types exchanged between scaler components.
//!
//! A tick reads one `QueueSnapshot` and one `FleetState`, and the policy
//! turns them into exactly one `ScalingDecision`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier a worker writes into the idle set (a Marathon task id).
pub type WorkerId = String;

// ── Queue ──────────────────────────────────────────────────────────

/// One segment of the three-stage work queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Jobs waiting for a worker (`q:in:…`).
    Pending,
    /// Jobs claimed by a worker (`q:proc:…`).
    Processing,
    /// Jobs finished (`q:done:…`).
    Done,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::Pending, Stage::Processing, Stage::Done];

    /// The key segment used by the queue store for this stage.
    pub fn segment(self) -> &'static str {
        match self {
            Stage::Pending => "in",
            Stage::Processing => "proc",
            Stage::Done => "done",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.segment())
    }
}

/// Depth of each queue stage for one (namespace, language) at one instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueSnapshot {
    pub in_len: u64,
    pub proc_len: u64,
    pub done_len: u64,
}

// ── Fleet ──────────────────────────────────────────────────────────

/// Current size of the worker pool and whether a rollout is in progress.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetState {
    pub worker_count: u64,
    /// While true no new scale command may be issued.
    pub deployment_active: bool,
}

// ── Decision ───────────────────────────────────────────────────────

/// The single action produced by the scaling policy for a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ScalingDecision {
    NoOp,
    /// Resize the pool to exactly `target` workers.
    ScaleUp { target: u64 },
    /// Shrink towards `target` by evicting up to `evict_count` idle workers.
    ScaleDown { target: u64, evict_count: u64 },
}

impl ScalingDecision {
    pub fn is_noop(&self) -> bool {
        matches!(self, ScalingDecision::NoOp)
    }
}

impl fmt::Display for ScalingDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalingDecision::NoOp => f.write_str("no-op"),
            ScalingDecision::ScaleUp { target } => write!(f, "scale-up to {target}"),
            ScalingDecision::ScaleDown {
                target,
                evict_count,
            } => write!(f, "scale-down to {target} (evict {evict_count})"),
        }
    }
}
