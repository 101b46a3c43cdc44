//! Service endpoint configuration.

use serde::Deserialize;
use std::time::Duration;

/// Where the external services live.
///
/// Every field has a default pointing at a local development stack, so the
/// whole struct can be omitted when loading from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceEndpoints {
    /// Base URL of the flow persistence service.
    #[serde(default = "default_flow_api_url")]
    pub flow_api_url: String,

    /// Base URL of the node runner's HTTP API.
    #[serde(default = "default_runner_api_url")]
    pub runner_api_url: String,

    /// URL of the node runner's execution event channel.
    #[serde(default = "default_runner_ws_url")]
    pub runner_ws_url: String,

    /// Base URL of the auth gateway.
    #[serde(default = "default_gateway_api_url")]
    pub gateway_api_url: String,

    /// Timeout applied to every HTTP request, in seconds.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_flow_api_url() -> String {
    "http://localhost:3001".to_string()
}

fn default_runner_api_url() -> String {
    "http://localhost:3002".to_string()
}

fn default_runner_ws_url() -> String {
    "ws://localhost:3002/ws".to_string()
}

fn default_gateway_api_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

impl Default for ServiceEndpoints {
    fn default() -> Self {
        Self {
            flow_api_url: default_flow_api_url(),
            runner_api_url: default_runner_api_url(),
            runner_ws_url: default_runner_ws_url(),
            gateway_api_url: default_gateway_api_url(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl ServiceEndpoints {
    /// Returns the request timeout, falling back to the default when zero.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        if self.timeout_seconds == 0 {
            Duration::from_secs(default_timeout_seconds())
        } else {
            Duration::from_secs(self.timeout_seconds)
        }
    }
}
