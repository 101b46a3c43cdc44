//! Shared HTTP plumbing for the REST clients.

use crate::error::ClientError;
use crate::session::SessionContext;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use rootcause::Report;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

/// A base URL plus the session that authenticates requests against it.
#[derive(Debug, Clone)]
pub(crate) struct ApiClient {
    http: Client,
    base_url: String,
    session: SessionContext,
}

impl ApiClient {
    pub(crate) fn new(
        base_url: &str,
        timeout: Duration,
        session: SessionContext,
    ) -> Result<Self, Report<ClientError>> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(format!("classflow/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ClientError::Configuration {
                details: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    pub(crate) fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn session(&self) -> &SessionContext {
        &self.session
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Starts a request, attaching the bearer token when signed in.
    pub(crate) fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.http.request(method, self.url(path));
        match self.session.get_token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Sends a request and decodes a JSON response.
    pub(crate) async fn send_json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
    ) -> Result<T, Report<ClientError>> {
        let response = self.send(builder).await?;
        let value = response.json::<T>().await.map_err(|e| ClientError::Decode {
            details: e.to_string(),
        })?;
        Ok(value)
    }

    /// Sends a request, mapping non-success statuses to errors.
    pub(crate) async fn send(&self, builder: RequestBuilder) -> Result<Response, Report<ClientError>> {
        let response = builder.send().await.map_err(|e| ClientError::Request {
            details: e.to_string(),
        })?;

        let status = response.status();
        debug!(status = status.as_u16(), url = %response.url(), "service responded");
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::UNAUTHORIZED {
            warn!("service rejected credentials");
            return Err(ClientError::Unauthorized.into());
        }
        Err(ClientError::Status {
            status: status.as_u16(),
            message: error_message(&body, status),
        }
        .into())
    }
}

/// Pulls a human-readable message out of an error body.
///
/// The services answer `{"message": ...}` or `{"error": ...}`; anything
/// else falls back to the raw body or the status reason.
fn error_message(body: &str, status: StatusCode) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["message", "error"] {
            if let Some(message) = value.get(key).and_then(|v| v.as_str()) {
                return message.to_string();
            }
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string()
    } else {
        trimmed.chars().take(200).collect()
    }
}
