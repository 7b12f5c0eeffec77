//! Marathon REST client.
//!
//! Only the handful of endpoints the scaler needs:
//!
//! ```text
//! GET    /v2/apps/{app}/tasks                 task list
//! GET    /v2/apps/{app}/                      app info (tasksRunning, deployments)
//! PUT    /v2/apps/{app}?force=true            {"instances": n}
//! DELETE /v2/deployments/{id}?force=true      cancel a deployment
//! DELETE /v2/apps/{app}/tasks/{id}?scale=true kill one task and shrink by one
//! ```

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{FleetError, FleetResult};

/// A deployment currently running against the app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentRef {
    pub id: String,
}

/// The part of Marathon's app description the scaler reads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppInfo {
    #[serde(default)]
    pub tasks_running: u64,
    #[serde(default)]
    pub deployments: Vec<DeploymentRef>,
}

#[derive(Deserialize)]
struct AppEnvelope {
    app: AppInfo,
}

#[derive(Deserialize)]
struct TaskRef {
    id: String,
}

#[derive(Deserialize)]
struct TasksEnvelope {
    #[serde(default)]
    tasks: Vec<TaskRef>,
}

#[derive(Serialize)]
struct ScaleRequest {
    instances: u64,
}

/// Operations the fleet controller issues against the orchestrator.
#[async_trait]
pub trait Orchestrator: Send + Sync {
    /// Ids of the app's current tasks.
    async fn list_tasks(&self) -> FleetResult<Vec<String>>;

    /// App description, including active deployments.
    async fn app_info(&self) -> FleetResult<AppInfo>;

    /// Resize the app to exactly `instances`.
    async fn scale(&self, instances: u64) -> FleetResult<()>;

    /// Force-cancel a deployment.
    async fn cancel_deployment(&self, deployment_id: &str) -> FleetResult<()>;

    /// Kill one task and shrink the app by one instance.
    async fn kill_task(&self, task_id: &str) -> FleetResult<()>;
}

/// `Orchestrator` over Marathon's v2 REST API.
pub struct MarathonClient {
    base_url: String,
    app: String,
    http: reqwest::Client,
}

impl MarathonClient {
    /// Build a client for `app` on the Marathon at `base_url`.
    ///
    /// `timeout` bounds every request.
    pub fn new(base_url: &str, app: &str, timeout: Duration) -> FleetResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("qscale/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            app: app.trim_matches('/').to_string(),
            http,
        })
    }

    pub fn app(&self) -> &str {
        &self.app
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> FleetResult<T> {
        let response = self.http.get(self.url(path)).send().await?;
        let response = check_status("GET", path, response).await?;
        Ok(response.json().await?)
    }

    async fn delete(&self, path: &str) -> FleetResult<()> {
        let response = self.http.delete(self.url(path)).send().await?;
        check_status("DELETE", path, response).await?;
        Ok(())
    }
}

async fn check_status(
    method: &'static str,
    path: &str,
    response: reqwest::Response,
) -> FleetResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(FleetError::Api {
        method,
        path: path.to_string(),
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl Orchestrator for MarathonClient {
    async fn list_tasks(&self) -> FleetResult<Vec<String>> {
        let path = format!("/v2/apps/{}/tasks", self.app);
        let body: TasksEnvelope = self.get(&path).await?;
        Ok(body.tasks.into_iter().map(|t| t.id).collect())
    }

    async fn app_info(&self) -> FleetResult<AppInfo> {
        let path = format!("/v2/apps/{}/", self.app);
        let body: AppEnvelope = self.get(&path).await?;
        Ok(body.app)
    }

    async fn scale(&self, instances: u64) -> FleetResult<()> {
        let path = format!("/v2/apps/{}?force=true", self.app);
        let response = self
            .http
            .put(self.url(&path))
            .json(&ScaleRequest { instances })
            .send()
            .await?;
        check_status("PUT", &path, response).await?;
        debug!(app = %self.app, instances, "scale request accepted");
        Ok(())
    }

    async fn cancel_deployment(&self, deployment_id: &str) -> FleetResult<()> {
        self.delete(&format!("/v2/deployments/{deployment_id}?force=true"))
            .await
    }

    async fn kill_task(&self, task_id: &str) -> FleetResult<()> {
        self.delete(&format!("/v2/apps/{}/tasks/{task_id}?scale=true", self.app))
            .await
    }
}
