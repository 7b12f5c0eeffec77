//! Fleet controller — the scaler's view of the worker pool.
//!
//! Reads fleet state, issues scale commands, and evicts idle workers one
//! task at a time. Write-side failures are logged and left for the next
//! tick to re-evaluate; read-side failures are returned so the caller can
//! abandon its decision.

use std::sync::Arc;

use qscale_core::{FleetState, WorkerCountSource, WorkerId};
use qscale_queue::IdleWorkerRegistry;
use tracing::{debug, info, warn};

use crate::error::FleetResult;
use crate::marathon::Orchestrator;

#[derive(Clone)]
pub struct FleetController {
    orchestrator: Arc<dyn Orchestrator>,
    source: WorkerCountSource,
}

impl FleetController {
    pub fn new(orchestrator: Arc<dyn Orchestrator>, source: WorkerCountSource) -> Self {
        Self {
            orchestrator,
            source,
        }
    }

    /// Current number of workers, read from the configured source.
    pub async fn worker_count(&self) -> FleetResult<u64> {
        match self.source {
            WorkerCountSource::Tasks => Ok(self.orchestrator.list_tasks().await?.len() as u64),
            WorkerCountSource::AppInfo => Ok(self.orchestrator.app_info().await?.tasks_running),
        }
    }

    /// Whether the orchestrator is in the middle of a deployment.
    pub async fn has_active_deployment(&self) -> FleetResult<bool> {
        Ok(!self.orchestrator.app_info().await?.deployments.is_empty())
    }

    /// Worker count and deployment status together.
    ///
    /// With `AppInfo` as the count source both come from one request.
    pub async fn fleet_state(&self) -> FleetResult<FleetState> {
        match self.source {
            WorkerCountSource::Tasks => Ok(FleetState {
                worker_count: self.worker_count().await?,
                deployment_active: self.has_active_deployment().await?,
            }),
            WorkerCountSource::AppInfo => {
                let info = self.orchestrator.app_info().await?;
                Ok(FleetState {
                    worker_count: info.tasks_running,
                    deployment_active: !info.deployments.is_empty(),
                })
            }
        }
    }

    /// Force-cancel every active deployment. Returns how many were cancelled.
    ///
    /// Best-effort: failures are logged, never returned.
    pub async fn cancel_active_deployments(&self) -> usize {
        let deployments = match self.orchestrator.app_info().await {
            Ok(info) => info.deployments,
            Err(e) => {
                warn!(error = %e, "could not list deployments to cancel");
                return 0;
            }
        };

        let mut cancelled = 0;
        for deployment in &deployments {
            match self.orchestrator.cancel_deployment(&deployment.id).await {
                Ok(()) => {
                    info!(deployment = %deployment.id, "cancelled active deployment");
                    cancelled += 1;
                }
                Err(e) => {
                    warn!(deployment = %deployment.id, error = %e, "failed to cancel deployment");
                }
            }
        }
        cancelled
    }

    /// Ask the orchestrator to run exactly `target` workers.
    pub async fn set_scale(&self, target: u64) -> FleetResult<()> {
        self.orchestrator.scale(target).await?;
        info!(target, "requested pool resize");
        Ok(())
    }

    /// Kill up to `limit` of `candidates`, in the order given.
    ///
    /// Each successful kill removes that worker from the idle set; a failed
    /// kill leaves it for a later tick. Returns the number killed.
    pub async fn evict(
        &self,
        candidates: &[WorkerId],
        limit: u64,
        registry: &IdleWorkerRegistry,
    ) -> u64 {
        let mut killed = 0;
        for candidate in candidates {
            if killed >= limit {
                break;
            }
            match self.orchestrator.kill_task(candidate).await {
                Ok(()) => {
                    killed += 1;
                    debug!(worker = %candidate, "evicted idle worker");
                    if let Err(e) = registry.remove(candidate).await {
                        warn!(worker = %candidate, error = %e, "evicted worker left in idle set");
                    }
                }
                Err(e) => {
                    warn!(worker = %candidate, error = %e, "failed to evict idle worker");
                }
            }
        }
        if killed > 0 {
            info!(killed, limit, candidates = candidates.len(), "evicted idle workers");
        }
        killed
    }
}
