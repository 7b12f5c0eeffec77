//! In-process orchestrator.
//!
//! Behaves like a single Marathon app: scaling grows or truncates the task
//! list, killing a task shrinks it by one. Individual tasks can be marked
//! as failing to kill, and the whole orchestrator can be made unreachable.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::{FleetError, FleetResult};
use crate::marathon::{AppInfo, DeploymentRef, Orchestrator};

#[derive(Default)]
struct FleetModel {
    tasks: Vec<String>,
    next_task: u64,
    deployments: Vec<String>,
    failing_kills: HashSet<String>,
    unavailable: bool,
    scale_requests: Vec<u64>,
    cancelled: Vec<String>,
    killed: Vec<String>,
}

impl FleetModel {
    fn spawn_task(&mut self) {
        self.next_task += 1;
        self.tasks.push(format!("task-{}", self.next_task));
    }
}

/// Shared-state fake of one Marathon app. `Clone` shares the model.
#[derive(Clone, Default)]
pub struct MemoryOrchestrator {
    inner: Arc<Mutex<FleetModel>>,
}

impl MemoryOrchestrator {
    /// An app running `tasks` with the given ids.
    pub fn with_tasks<I, S>(tasks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let model = FleetModel {
            tasks: tasks.into_iter().map(Into::into).collect(),
            ..FleetModel::default()
        };
        Self {
            inner: Arc::new(Mutex::new(model)),
        }
    }

    /// An app running `count` anonymously named tasks.
    pub fn with_task_count(count: u64) -> Self {
        let mut model = FleetModel::default();
        for _ in 0..count {
            model.spawn_task();
        }
        Self {
            inner: Arc::new(Mutex::new(model)),
        }
    }

    pub async fn add_deployment(&self, id: &str) {
        self.inner.lock().await.deployments.push(id.to_string());
    }

    pub async fn fail_kill(&self, task_id: &str) {
        self.inner
            .lock()
            .await
            .failing_kills
            .insert(task_id.to_string());
    }

    pub async fn set_unavailable(&self, unavailable: bool) {
        self.inner.lock().await.unavailable = unavailable;
    }

    pub async fn tasks(&self) -> Vec<String> {
        self.inner.lock().await.tasks.clone()
    }

    pub async fn scale_requests(&self) -> Vec<u64> {
        self.inner.lock().await.scale_requests.clone()
    }

    pub async fn cancelled(&self) -> Vec<String> {
        self.inner.lock().await.cancelled.clone()
    }

    pub async fn killed(&self) -> Vec<String> {
        self.inner.lock().await.killed.clone()
    }
}

fn unavailable_check(model: &FleetModel) -> FleetResult<()> {
    if model.unavailable {
        Err(FleetError::Unavailable)
    } else {
        Ok(())
    }
}

#[async_trait]
impl Orchestrator for MemoryOrchestrator {
    async fn list_tasks(&self) -> FleetResult<Vec<String>> {
        let model = self.inner.lock().await;
        unavailable_check(&model)?;
        Ok(model.tasks.clone())
    }

    async fn app_info(&self) -> FleetResult<AppInfo> {
        let model = self.inner.lock().await;
        unavailable_check(&model)?;
        Ok(AppInfo {
            tasks_running: model.tasks.len() as u64,
            deployments: model
                .deployments
                .iter()
                .map(|id| DeploymentRef { id: id.clone() })
                .collect(),
        })
    }

    async fn scale(&self, instances: u64) -> FleetResult<()> {
        let mut model = self.inner.lock().await;
        unavailable_check(&model)?;
        model.scale_requests.push(instances);
        let target = usize::try_from(instances).unwrap_or(usize::MAX);
        while model.tasks.len() < target {
            model.spawn_task();
        }
        model.tasks.truncate(target);
        Ok(())
    }

    async fn cancel_deployment(&self, deployment_id: &str) -> FleetResult<()> {
        let mut model = self.inner.lock().await;
        unavailable_check(&model)?;
        let before = model.deployments.len();
        model.deployments.retain(|d| d != deployment_id);
        if model.deployments.len() == before {
            return Err(FleetError::Api {
                method: "DELETE",
                path: format!("/v2/deployments/{deployment_id}"),
                status: 404,
                message: "unknown deployment".to_string(),
            });
        }
        model.cancelled.push(deployment_id.to_string());
        Ok(())
    }

    async fn kill_task(&self, task_id: &str) -> FleetResult<()> {
        let mut model = self.inner.lock().await;
        unavailable_check(&model)?;
        let path = format!("/v2/apps/memory/tasks/{task_id}");
        if model.failing_kills.contains(task_id) {
            return Err(FleetError::Api {
                method: "DELETE",
                path,
                status: 503,
                message: "kill rejected".to_string(),
            });
        }
        let Some(pos) = model.tasks.iter().position(|t| t == task_id) else {
            return Err(FleetError::Api {
                method: "DELETE",
                path,
                status: 404,
                message: "unknown task".to_string(),
            });
        };
        model.tasks.remove(pos);
        model.killed.push(task_id.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scale_grows_and_shrinks_task_list() {
        let fleet = MemoryOrchestrator::with_task_count(2);
        fleet.scale(5).await.unwrap();
        assert_eq!(fleet.list_tasks().await.unwrap().len(), 5);
        fleet.scale(1).await.unwrap();
        assert_eq!(fleet.tasks().await, vec!["task-1"]);
        assert_eq!(fleet.scale_requests().await, vec![5, 1]);
    }

    #[tokio::test]
    async fn kill_unknown_task_is_not_found() {
        let fleet = MemoryOrchestrator::with_tasks(["w1"]);
        let err = fleet.kill_task("w2").await.unwrap_err();
        assert!(matches!(err, FleetError::Api { status: 404, .. }));
    }

    #[tokio::test]
    async fn unavailable_rejects_reads() {
        let fleet = MemoryOrchestrator::with_task_count(1);
        fleet.set_unavailable(true).await;
        assert!(matches!(fleet.app_info().await, Err(FleetError::Unavailable)));
    }
}
