//! Node runner client: executions, retries and cron schedules.

use crate::config::ServiceEndpoints;
use crate::error::ClientError;
use crate::http::ApiClient;
use crate::session::SessionContext;
use chrono::{DateTime, Utc};
use classflow_core::{CronJobId, ExecutionId, FlowId};
use classflow_graph::NodeId;
use reqwest::Method;
use rootcause::Report;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, instrument};

/// Lifecycle of an execution as reported by the runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Completed,
    Failed,
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Reply to a start or retry request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionStarted {
    pub execution_id: ExecutionId,
    #[serde(default)]
    pub status: Option<ExecutionStatus>,
}

/// One past execution of a flow.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionSummary {
    #[serde(alias = "executionId")]
    pub id: ExecutionId,
    pub status: ExecutionStatus,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    /// Node the execution failed on.
    #[serde(default)]
    pub failed_node_id: Option<NodeId>,
    #[serde(default)]
    pub error: Option<String>,
}

/// A recurring schedule for a flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CronJob {
    pub id: CronJobId,
    pub flow_id: FlowId,
    /// Five-field cron expression.
    pub schedule: String,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    #[serde(default)]
    pub next_run_at: Option<DateTime<Utc>>,
}

fn enabled_by_default() -> bool {
    true
}

/// Fields for scheduling a flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCronJob {
    pub flow_id: FlowId,
    pub schedule: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
}

/// Partial update of a cron job. Unset fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CronJobUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

/// HTTP client for the node runner.
#[derive(Debug, Clone)]
pub struct RunnerClient {
    api: ApiClient,
}

impl RunnerClient {
    /// Creates a client for the configured runner.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        endpoints: &ServiceEndpoints,
        session: SessionContext,
    ) -> Result<Self, Report<ClientError>> {
        Ok(Self {
            api: ApiClient::new(&endpoints.runner_api_url, endpoints.timeout(), session)?,
        })
    }

    /// Starts an execution of the stored version of a flow.
    #[instrument(skip(self), fields(flow_id = %flow_id))]
    pub async fn execute(&self, flow_id: &FlowId) -> Result<ExecutionStarted, Report<ClientError>> {
        let started: ExecutionStarted = self
            .api
            .send_json(
                self.api
                    .request(Method::POST, &format!("/workflow/execute/{flow_id}"))
                    .json(&json!({})),
            )
            .await?;
        info!(execution_id = %started.execution_id, "execution started");
        Ok(started)
    }

    /// Re-runs a failed execution from `from_node`.
    #[instrument(skip(self), fields(execution_id = %execution_id, from_node = %from_node))]
    pub async fn retry(
        &self,
        execution_id: &ExecutionId,
        from_node: &NodeId,
    ) -> Result<ExecutionStarted, Report<ClientError>> {
        self.api
            .send_json(
                self.api
                    .request(Method::POST, &format!("/workflow/retry/{execution_id}"))
                    .json(&json!({ "fromNodeId": from_node })),
            )
            .await
    }

    /// Lists past executions of a flow, newest first.
    #[instrument(skip(self), fields(flow_id = %flow_id))]
    pub async fn executions(
        &self,
        flow_id: &FlowId,
    ) -> Result<Vec<ExecutionSummary>, Report<ClientError>> {
        self.api
            .send_json(
                self.api
                    .request(Method::GET, &format!("/workflow/executions/{flow_id}")),
            )
            .await
    }

    #[instrument(skip(self, job), fields(flow_id = %job.flow_id))]
    pub async fn create_cron(&self, job: &NewCronJob) -> Result<CronJob, Report<ClientError>> {
        self.api
            .send_json(self.api.request(Method::POST, "/workflow/cron").json(job))
            .await
    }

    #[instrument(skip(self), fields(flow_id = %flow_id))]
    pub async fn list_cron(&self, flow_id: &FlowId) -> Result<Vec<CronJob>, Report<ClientError>> {
        self.api
            .send_json(
                self.api
                    .request(Method::GET, &format!("/workflow/cron/{flow_id}")),
            )
            .await
    }

    #[instrument(skip(self, update), fields(job_id = %job_id))]
    pub async fn update_cron(
        &self,
        job_id: &CronJobId,
        update: &CronJobUpdate,
    ) -> Result<CronJob, Report<ClientError>> {
        self.api
            .send_json(
                self.api
                    .request(Method::PUT, &format!("/workflow/cron/{job_id}"))
                    .json(update),
            )
            .await
    }

    #[instrument(skip(self), fields(job_id = %job_id))]
    pub async fn delete_cron(&self, job_id: &CronJobId) -> Result<(), Report<ClientError>> {
        self.api
            .send(
                self.api
                    .request(Method::DELETE, &format!("/workflow/cron/{job_id}")),
            )
            .await?;
        Ok(())
    }
}
