//! Session context shared by the service clients.
//!
//! The session holds the bearer token issued by the auth gateway. Clients
//! read it on every request, so signing in or out takes effect immediately
//! for all of them. A session can be backed by a file, which keeps the user
//! signed in across CLI invocations.

use crate::error::ClientError;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use classflow_core::UserId;
use rootcause::Report;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

/// Claims read from the token payload.
///
/// The signature is not verified; the gateway does that on every request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenClaims {
    /// The user the token was issued to.
    pub sub: String,
    /// Expiry as seconds since the Unix epoch.
    #[serde(default)]
    pub exp: Option<i64>,
    #[serde(default)]
    pub email: Option<String>,
}

impl TokenClaims {
    /// Returns the user ID named by the token.
    #[must_use]
    pub fn user_id(&self) -> Option<UserId> {
        self.sub.parse().ok()
    }

    /// Returns when the token expires, if it says.
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.exp.and_then(|exp| DateTime::from_timestamp(exp, 0))
    }

    /// Whether the token has expired at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_some_and(|at| at <= now)
    }
}

/// Decodes the claims of a JWT without verifying it.
///
/// # Errors
///
/// Returns an error if the token is not three dot-separated segments or
/// its payload is not base64url-encoded JSON.
pub fn decode_claims(token: &str) -> Result<TokenClaims, ClientError> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err(ClientError::InvalidToken {
            details: "expected three segments".to_string(),
        });
    }

    let payload = URL_SAFE_NO_PAD
        .decode(parts[1].trim_end_matches('='))
        .map_err(|e| ClientError::InvalidToken {
            details: format!("payload is not base64url: {e}"),
        })?;

    serde_json::from_slice(&payload).map_err(|e| ClientError::InvalidToken {
        details: format!("payload is not valid claims: {e}"),
    })
}

/// The signed-in user's token.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    token: Arc<RwLock<Option<String>>>,
    path: Option<PathBuf>,
}

impl SessionContext {
    /// Creates an in-memory session with no token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an in-memory session holding `token`.
    #[must_use]
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Arc::new(RwLock::new(Some(token.into()))),
            path: None,
        }
    }

    /// Opens a session stored in `path`, reading any saved token.
    ///
    /// A missing file means signed out.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, Report<ClientError>> {
        let path = path.into();
        let token = match std::fs::read_to_string(&path) {
            Ok(contents) => Some(contents.trim().to_string()).filter(|t| !t.is_empty()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                return Err(ClientError::Session {
                    details: format!("failed to read {}: {e}", path.display()),
                }
                .into());
            }
        };
        debug!(path = %path.display(), signed_in = token.is_some(), "opened session");
        Ok(Self {
            token: Arc::new(RwLock::new(token)),
            path: Some(path),
        })
    }

    /// Returns the backing file, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Returns the current token.
    #[must_use]
    pub fn get_token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replaces the current token.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing file cannot be written. The in-memory
    /// token is updated either way.
    pub fn set_token(&self, token: impl Into<String>) -> Result<(), Report<ClientError>> {
        let token = token.into();
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = Some(token.clone());
        if let Some(path) = &self.path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| ClientError::Session {
                    details: format!("failed to create {}: {e}", parent.display()),
                })?;
            }
            std::fs::write(path, token).map_err(|e| ClientError::Session {
                details: format!("failed to write {}: {e}", path.display()),
            })?;
        }
        Ok(())
    }

    /// Signs out.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing file exists but cannot be removed.
    pub fn clear(&self) -> Result<(), Report<ClientError>> {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = None;
        if let Some(path) = &self.path {
            match std::fs::remove_file(path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(ClientError::Session {
                        details: format!("failed to remove {}: {e}", path.display()),
                    }
                    .into());
                }
            }
        }
        Ok(())
    }

    /// Whether a token is present.
    #[must_use]
    pub fn is_signed_in(&self) -> bool {
        self.get_token().is_some()
    }

    /// Returns the current token's claims, if it has readable ones.
    #[must_use]
    pub fn claims(&self) -> Option<TokenClaims> {
        self.get_token()
            .and_then(|token| decode_claims(&token).ok())
    }

    /// Returns the signed-in user's ID.
    #[must_use]
    pub fn user_id(&self) -> Option<UserId> {
        self.claims().and_then(|claims| claims.user_id())
    }
}

#[cfg(test)]
pub(crate) fn test_token(sub: &str, exp: i64) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"sub":"{sub}","exp":{exp}}}"#));
    format!("{header}.{payload}.signature")
}
