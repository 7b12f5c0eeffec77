//! Control loop — one tick at a time.
//!
//! ```text
//! observe queue + fleet ─► ErrorTracker ─► ScalingPolicy ─► FleetController
//!                                                   │
//!                              MetricsEmitter ◄─────┤
//!                                                   └─► evict idle ─► clear idle set
//! ```
//!
//! Every external call is bounded by `call_timeout` and the tick as a whole
//! by `tick_deadline`. A failed observation skips the decision for that
//! tick; a failed action is logged and re-evaluated on the next tick.

use std::future::Future;
use std::time::Duration;

use qscale_core::{FleetState, QueueSnapshot, ScalerConfig, ScalingDecision, Stage};
use qscale_fleet::FleetController;
use qscale_metrics::{MetricsEmitter, TickGauges};
use qscale_queue::{IdleWorkerRegistry, QueueInspector};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::TickError;
use crate::policy::{Evaluation, PolicyLimits, ScalingPolicy};
use crate::tracker::ErrorTracker;

/// Timing knobs for the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopTiming {
    pub poll_interval: Duration,
    pub call_timeout: Duration,
    pub tick_deadline: Duration,
}

impl LoopTiming {
    pub fn from_config(config: &ScalerConfig) -> Self {
        Self {
            poll_interval: config.poll_interval,
            call_timeout: config.call_timeout,
            tick_deadline: config.tick_deadline,
        }
    }
}

/// The collaborators a loop drives.
pub struct LoopComponents {
    pub inspector: QueueInspector,
    pub registry: IdleWorkerRegistry,
    pub fleet: FleetController,
    pub metrics: MetricsEmitter,
}

/// What happened in a completed tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickSummary {
    pub snapshot: QueueSnapshot,
    pub fleet: FleetState,
    pub err_hwm: u64,
    pub effective_proc_len: u64,
    pub idle_streak: u64,
    pub decision: ScalingDecision,
    /// The decision was held back by an active deployment.
    pub deferred: bool,
    /// Idle workers actually terminated.
    pub evicted: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    Completed(TickSummary),
    /// Observations could not be read; nothing was decided.
    Skipped { reason: String },
    /// The tick ran past its deadline and was dropped mid-way.
    Abandoned,
}

pub struct ControlLoop {
    inspector: QueueInspector,
    registry: IdleWorkerRegistry,
    fleet: FleetController,
    metrics: MetricsEmitter,
    tracker: ErrorTracker,
    policy: ScalingPolicy,
    timing: LoopTiming,
}

async fn bounded<T, E, F>(limit: Duration, call: &'static str, fut: F) -> Result<T, TickError>
where
    F: Future<Output = Result<T, E>>,
    TickError: From<E>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result.map_err(TickError::from),
        Err(_) => Err(TickError::Timeout { call, after: limit }),
    }
}

impl ControlLoop {
    /// Take the first observation and seed the error high-water mark.
    ///
    /// Fails if either the queue store or the orchestrator cannot be read;
    /// the caller should treat that as fatal.
    pub async fn bootstrap(
        components: LoopComponents,
        limits: PolicyLimits,
        timing: LoopTiming,
    ) -> Result<Self, TickError> {
        let proc_len = bounded(
            timing.call_timeout,
            "processing depth",
            components.inspector.depth(Stage::Processing),
        )
        .await?;
        let worker_count = bounded(
            timing.call_timeout,
            "worker count",
            components.fleet.worker_count(),
        )
        .await?;

        let tracker = ErrorTracker::seeded(proc_len, worker_count);
        info!(
            proc_len,
            worker_count,
            err_hwm = tracker.high_water_mark(),
            "seeded error high-water mark"
        );

        Ok(Self {
            inspector: components.inspector,
            registry: components.registry,
            fleet: components.fleet,
            metrics: components.metrics,
            tracker,
            policy: ScalingPolicy::new(limits),
            timing,
        })
    }

    pub fn err_hwm(&self) -> u64 {
        self.tracker.high_water_mark()
    }

    pub fn idle_streak(&self) -> u64 {
        self.policy.idle_streak()
    }

    /// Run one tick. Never fails; the outcome says how far it got.
    ///
    /// The idle set is cleared at the end of every tick that did not blow
    /// its deadline, whether or not anything was evicted.
    pub async fn tick(&mut self) -> TickOutcome {
        let deadline = self.timing.tick_deadline;
        let outcome = match tokio::time::timeout(deadline, self.run_tick()).await {
            Ok(Ok(summary)) => TickOutcome::Completed(summary),
            Ok(Err(e)) => {
                warn!(error = %e, "tick skipped");
                TickOutcome::Skipped {
                    reason: e.to_string(),
                }
            }
            Err(_) => {
                warn!(?deadline, "tick exceeded its deadline and was abandoned");
                return TickOutcome::Abandoned;
            }
        };

        let clear = self.registry.clear();
        if let Err(e) = bounded(self.timing.call_timeout, "clear idle set", clear).await {
            warn!(error = %e, "failed to clear idle set");
        }
        outcome
    }

    async fn run_tick(&mut self) -> Result<TickSummary, TickError> {
        let call_timeout = self.timing.call_timeout;

        let snapshot = bounded(call_timeout, "queue snapshot", self.inspector.snapshot()).await?;
        let fleet = bounded(call_timeout, "fleet state", self.fleet.fleet_state()).await?;

        self.tracker.observe(snapshot.proc_len, fleet.worker_count);
        let err_hwm = self.tracker.high_water_mark();

        info!(
            in_len = snapshot.in_len,
            proc_len = snapshot.proc_len,
            done_len = snapshot.done_len,
            err_hwm,
            workers = fleet.worker_count,
            deployment_active = fleet.deployment_active,
            "observed"
        );

        let eval = self.policy.evaluate(&snapshot, &fleet, err_hwm);
        self.apply(&eval, &fleet).await;

        let gauges = TickGauges {
            in_len: snapshot.in_len,
            effective_proc_len: eval.effective_proc_len,
            err_hwm,
            done_len: snapshot.done_len,
            worker_count: fleet.worker_count,
        };
        let keys = self.inspector.keys();
        let emit = self.metrics.emit(keys.namespace(), keys.language(), &gauges);
        if tokio::time::timeout(call_timeout, emit).await.is_err() {
            warn!(?call_timeout, "metrics emission timed out");
        }

        let evicted = match eval.decision {
            ScalingDecision::ScaleDown { evict_count, .. } => self.evict_idle(evict_count).await,
            _ => 0,
        };

        Ok(TickSummary {
            snapshot,
            fleet,
            err_hwm,
            effective_proc_len: eval.effective_proc_len,
            idle_streak: eval.idle_streak,
            decision: eval.decision,
            deferred: eval.deferred,
            evicted,
        })
    }

    async fn apply(&self, eval: &Evaluation, fleet: &FleetState) {
        match eval.decision {
            ScalingDecision::ScaleUp { target } => {
                info!(from = fleet.worker_count, target, "scaling up");
                if let Err(e) =
                    bounded(self.timing.call_timeout, "scale", self.fleet.set_scale(target)).await
                {
                    warn!(target, error = %e, "scale-up request failed");
                }
            }
            ScalingDecision::ScaleDown {
                target,
                evict_count,
            } => {
                info!(from = fleet.worker_count, target, evict_count, "requesting scale-down");
            }
            ScalingDecision::NoOp if eval.deferred => {
                info!("deployment in progress; cancelling it so the next tick can act");
                let cancel = self.fleet.cancel_active_deployments();
                match tokio::time::timeout(self.timing.call_timeout, cancel).await {
                    Ok(cancelled) => debug!(cancelled, "deployments cancelled"),
                    Err(_) => warn!("cancelling deployments timed out"),
                }
            }
            ScalingDecision::NoOp => {}
        }
    }

    async fn evict_idle(&self, evict_count: u64) -> u64 {
        let candidates = match bounded(
            self.timing.call_timeout,
            "read idle set",
            self.registry.read_candidates(),
        )
        .await
        {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!(error = %e, "could not read idle candidates");
                return 0;
            }
        };

        let killed = self
            .fleet
            .evict(&candidates, evict_count, &self.registry)
            .await;
        info!(killed, requested = evict_count, "scaled down");
        killed
    }

    /// Tick, then sleep `poll_interval`, until `shutdown` flips.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) {
        info!(
            namespace = %self.inspector.keys().namespace(),
            language = %self.inspector.keys().language(),
            poll_interval = ?self.timing.poll_interval,
            idle_ticks = self.policy.limits().idle_ticks_threshold,
            max_workers = self.policy.limits().max_workers,
            "control loop started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            let outcome = self.tick().await;
            debug!(?outcome, "tick finished");

            tokio::select! {
                _ = tokio::time::sleep(self.timing.poll_interval) => {}
                _ = shutdown.changed() => {
                    info!("control loop shutting down");
                    break;
                }
            }
        }
    }
}
