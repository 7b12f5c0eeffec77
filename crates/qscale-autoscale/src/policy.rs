//! Scaling policy — the decision core.
//!
//! `decide()` is a pure function of one tick's observations and the idle
//! streak carried over from the previous tick. `ScalingPolicy` owns that
//! streak between ticks.

use qscale_core::{FleetState, QueueSnapshot, ScalingDecision};
use tracing::debug;

/// Fixed bounds the policy works within.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyLimits {
    /// Upper bound for any scale-up target.
    pub max_workers: u64,
    /// Consecutive surplus ticks needed before scaling down.
    pub idle_ticks_threshold: u64,
}

/// Everything the policy concluded for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evaluation {
    pub decision: ScalingDecision,
    /// Idle streak to carry into the next tick.
    pub idle_streak: u64,
    pub effective_proc_len: u64,
    /// Pending jobs outnumber workers. Blocks any scale-down this tick.
    pub backlog: bool,
    /// An action was due but an active deployment held it back.
    pub deferred: bool,
}

/// Evaluate one tick.
pub fn decide(
    snapshot: &QueueSnapshot,
    fleet: &FleetState,
    err_hwm: u64,
    idle_streak: u64,
    limits: &PolicyLimits,
) -> Evaluation {
    let workers = fleet.worker_count;
    let mut decision = ScalingDecision::NoOp;
    let mut deferred = false;

    let backlog = snapshot.in_len > workers;
    if backlog {
        let target = limits.max_workers.min(snapshot.in_len);
        if workers < target {
            if fleet.deployment_active {
                deferred = true;
            } else {
                decision = ScalingDecision::ScaleUp { target };
            }
        }
    }

    let effective_proc_len = snapshot.proc_len.saturating_sub(err_hwm);
    let idle_streak = if effective_proc_len < workers {
        idle_streak.saturating_add(1)
    } else {
        0
    };

    if idle_streak >= limits.idle_ticks_threshold && !backlog {
        let target = effective_proc_len;
        if target < workers {
            if fleet.deployment_active {
                deferred = true;
            } else {
                decision = ScalingDecision::ScaleDown {
                    target,
                    evict_count: workers - target,
                };
            }
        }
    }

    Evaluation {
        decision,
        idle_streak,
        effective_proc_len,
        backlog,
        deferred,
    }
}

/// `decide()` plus the idle streak it threads from tick to tick.
#[derive(Debug, Clone)]
pub struct ScalingPolicy {
    limits: PolicyLimits,
    idle_streak: u64,
}

impl ScalingPolicy {
    pub fn new(limits: PolicyLimits) -> Self {
        Self {
            limits,
            idle_streak: 0,
        }
    }

    pub fn limits(&self) -> &PolicyLimits {
        &self.limits
    }

    pub fn idle_streak(&self) -> u64 {
        self.idle_streak
    }

    pub fn evaluate(
        &mut self,
        snapshot: &QueueSnapshot,
        fleet: &FleetState,
        err_hwm: u64,
    ) -> Evaluation {
        let eval = decide(snapshot, fleet, err_hwm, self.idle_streak, &self.limits);
        self.idle_streak = eval.idle_streak;
        debug!(
            decision = %eval.decision,
            idle_streak = eval.idle_streak,
            threshold = self.limits.idle_ticks_threshold,
            backlog = eval.backlog,
            deferred = eval.deferred,
            "policy evaluated"
        );
        eval
    }
}
