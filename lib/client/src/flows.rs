//! Flow persistence service client.
//!
//! Flows are stored as records whose graph is a JSON string in
//! `reactFlowData`. The editor only ever reads one flow and writes it back
//! whole, so [`FlowStore`] is the seam the autosave scheduler depends on.

use crate::config::ServiceEndpoints;
use crate::error::ClientError;
use crate::http::ApiClient;
use crate::session::SessionContext;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use classflow_core::{FlowId, UserId};
use classflow_graph::{GraphError, GraphState};
use reqwest::Method;
use rootcause::Report;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

/// A flow as stored by the persistence service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowRecord {
    pub id: FlowId,
    pub user_id: UserId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// The serialized graph document.
    #[serde(default)]
    pub react_flow_data: Option<String>,
}

impl FlowRecord {
    /// Loads the stored graph, falling back to a start-only graph.
    #[must_use]
    pub fn graph(&self) -> GraphState {
        GraphState::load(self.react_flow_data.as_deref())
    }

    /// Copies `graph` into the record, along with its activity.
    ///
    /// # Errors
    ///
    /// Returns an error if the graph cannot be serialized.
    pub fn set_graph(&mut self, graph: &GraphState) -> Result<(), GraphError> {
        self.react_flow_data = Some(graph.to_json()?);
        self.is_active = graph.activity().is_active;
        self.updated_at = Some(Utc::now());
        Ok(())
    }
}

/// Fields for creating a flow.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFlow {
    pub user_id: UserId,
    pub name: String,
    pub description: String,
    pub react_flow_data: String,
}

/// Reads and writes whole flow records.
#[async_trait]
pub trait FlowStore: Send + Sync {
    /// Fetches a flow by ID.
    async fn load_flow(&self, id: &FlowId) -> Result<FlowRecord, Report<ClientError>>;

    /// Replaces a stored flow. Last writer wins.
    async fn save_flow(&self, flow: &FlowRecord) -> Result<(), Report<ClientError>>;
}

/// HTTP client for the flow persistence service.
#[derive(Debug, Clone)]
pub struct FlowClient {
    api: ApiClient,
}

impl FlowClient {
    /// Creates a client for the configured flow service.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        endpoints: &ServiceEndpoints,
        session: SessionContext,
    ) -> Result<Self, Report<ClientError>> {
        Ok(Self {
            api: ApiClient::new(&endpoints.flow_api_url, endpoints.timeout(), session)?,
        })
    }

    /// Fetches a flow.
    #[instrument(skip(self), fields(flow_id = %id))]
    pub async fn get_flow(&self, id: &FlowId) -> Result<FlowRecord, Report<ClientError>> {
        self.api
            .send_json(self.api.request(Method::GET, &format!("/flows/{id}")))
            .await
    }

    /// Replaces a flow.
    #[instrument(skip(self, flow), fields(flow_id = %flow.id))]
    pub async fn update_flow(&self, flow: &FlowRecord) -> Result<(), Report<ClientError>> {
        self.api
            .send(
                self.api
                    .request(Method::PUT, &format!("/flows/{}", flow.id))
                    .json(flow),
            )
            .await?;
        info!(is_active = flow.is_active, "flow saved");
        Ok(())
    }

    /// Creates a flow with a start-only graph.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, description))]
    pub async fn create_flow(
        &self,
        user_id: &UserId,
        name: &str,
        description: &str,
    ) -> Result<FlowRecord, Report<ClientError>> {
        let graph = GraphState::new()
            .to_json()
            .map_err(|e| ClientError::Decode {
                details: e.to_string(),
            })?;
        let body = NewFlow {
            user_id: user_id.clone(),
            name: name.to_string(),
            description: description.to_string(),
            react_flow_data: graph,
        };
        let created: FlowRecord = self
            .api
            .send_json(self.api.request(Method::POST, "/flows").json(&body))
            .await?;
        info!(flow_id = %created.id, "flow created");
        Ok(created)
    }

    /// Lists a user's flows.
    #[instrument(skip(self))]
    pub async fn list_flows(&self, user_id: &UserId) -> Result<Vec<FlowRecord>, Report<ClientError>> {
        self.api
            .send_json(self.api.request(Method::GET, &format!("/flows/user/{user_id}")))
            .await
    }
}

#[async_trait]
impl FlowStore for FlowClient {
    async fn load_flow(&self, id: &FlowId) -> Result<FlowRecord, Report<ClientError>> {
        self.get_flow(id).await
    }

    async fn save_flow(&self, flow: &FlowRecord) -> Result<(), Report<ClientError>> {
        self.update_flow(flow).await
    }
}
