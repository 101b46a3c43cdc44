//! Auth gateway client.
//!
//! Successful sign-ins store the issued token in the shared
//! [`SessionContext`], so every other client picks it up.

use crate::config::ServiceEndpoints;
use crate::error::ClientError;
use crate::http::ApiClient;
use crate::session::SessionContext;
use classflow_core::UserId;
use reqwest::{Method, Url};
use rootcause::Report;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

/// The signed-in user's account.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: UserId,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    token: String,
    user: UserProfile,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RegisterRequest<'a> {
    name: &'a str,
    email: &'a str,
    password: &'a str,
}

/// HTTP client for the auth gateway.
#[derive(Debug, Clone)]
pub struct AuthClient {
    api: ApiClient,
}

impl AuthClient {
    /// Creates a client for the configured gateway.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        endpoints: &ServiceEndpoints,
        session: SessionContext,
    ) -> Result<Self, Report<ClientError>> {
        Ok(Self {
            api: ApiClient::new(&endpoints.gateway_api_url, endpoints.timeout(), session)?,
        })
    }

    /// Signs in with email and password.
    #[instrument(skip(self, password))]
    pub async fn login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<UserProfile, Report<ClientError>> {
        let response: AuthResponse = self
            .api
            .send_json(
                self.api
                    .request(Method::POST, "/auth/login")
                    .json(&LoginRequest { email, password }),
            )
            .await?;
        self.complete(response)
    }

    /// Creates an account and signs in.
    #[instrument(skip(self, password))]
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<UserProfile, Report<ClientError>> {
        let response: AuthResponse = self
            .api
            .send_json(
                self.api
                    .request(Method::POST, "/auth/register")
                    .json(&RegisterRequest {
                        name,
                        email,
                        password,
                    }),
            )
            .await?;
        self.complete(response)
    }

    /// URL that starts the Google sign-in flow in a browser.
    #[must_use]
    pub fn google_login_url(&self) -> String {
        self.api.url("/auth/google")
    }

    /// Finishes a Google sign-in from the URL the gateway redirected to.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL carries no token or the profile lookup
    /// fails.
    #[instrument(skip(self, callback_url))]
    pub async fn complete_google_login(
        &self,
        callback_url: &str,
    ) -> Result<UserProfile, Report<ClientError>> {
        let token = token_from_callback(callback_url)?;
        self.api.session().set_token(token)?;
        self.profile().await
    }

    /// Fetches the signed-in user's profile.
    #[instrument(skip(self))]
    pub async fn profile(&self) -> Result<UserProfile, Report<ClientError>> {
        if !self.api.session().is_signed_in() {
            return Err(ClientError::Unauthorized.into());
        }
        self.api
            .send_json(self.api.request(Method::GET, "/auth/profile"))
            .await
    }

    /// Signs out.
    ///
    /// # Errors
    ///
    /// Returns an error if a stored session cannot be removed.
    pub fn logout(&self) -> Result<(), Report<ClientError>> {
        self.api.session().clear()?;
        info!(gateway = self.api.base_url(), "signed out");
        Ok(())
    }

    fn complete(&self, response: AuthResponse) -> Result<UserProfile, Report<ClientError>> {
        self.api.session().set_token(response.token)?;
        info!(user_id = %response.user.id, "signed in");
        Ok(response.user)
    }
}

/// Extracts the token from an OAuth callback URL's `token` query parameter.
///
/// # Errors
///
/// Returns an error if the URL is invalid or has no non-empty token.
pub fn token_from_callback(callback_url: &str) -> Result<String, ClientError> {
    let url = Url::parse(callback_url).map_err(|e| ClientError::InvalidToken {
        details: format!("invalid callback URL: {e}"),
    })?;
    url.query_pairs()
        .find(|(key, _)| key == "token")
        .map(|(_, value)| value.into_owned())
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ClientError::InvalidToken {
            details: "callback URL has no token".to_string(),
        })
}
