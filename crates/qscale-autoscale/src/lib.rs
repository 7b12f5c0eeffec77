//! qscale-autoscale — the scaling decision engine.
//!
//! Turns polled queue depths and fleet state into scale-up / scale-down
//! actions for one worker pool, while separating real backlog from jobs
//! stranded in the processing queue by crashed workers.
//!
//! # Scaling Algorithm
//!
//! ```text
//! err_hwm grows by (proc - err_hwm) - workers whenever that is positive
//! effective_proc = max(proc - err_hwm, 0)
//!
//! if in > workers:
//!     target = min(max_workers, in)
//!     ScaleUp(target)             unless workers >= target
//!                                 or a deployment is active (deferred)
//!
//! idle_streak = effective_proc < workers ? idle_streak + 1 : 0
//!
//! if idle_streak >= idle_ticks and no backlog:
//!     ScaleDown(effective_proc, evict workers - effective_proc)
//! ```
//!
//! `idle_ticks = ceil(idle_window / poll_interval)` gives the hysteresis.
//! Scale-down evicts only workers that have put themselves in the idle
//! set, so a busy worker is never killed.

pub mod control;
pub mod error;
pub mod policy;
pub mod tracker;

pub use control::{ControlLoop, LoopComponents, LoopTiming, TickOutcome, TickSummary};
pub use error::TickError;
pub use policy::{decide, Evaluation, PolicyLimits, ScalingPolicy};
pub use tracker::ErrorTracker;
