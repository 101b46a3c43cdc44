//! Error types for the service clients.
//!
//! Every client call returns `Report<ClientError>` so callers can attach
//! their own context as the error propagates.

use std::fmt;

/// Errors from talking to the flow, runner or auth services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// The HTTP client could not be built.
    Configuration { details: String },
    /// The request never produced a response.
    Request { details: String },
    /// The service rejected the bearer token, or none was sent.
    Unauthorized,
    /// The service answered with a non-success status.
    Status { status: u16, message: String },
    /// The response body did not match the expected shape.
    Decode { details: String },
    /// The event channel could not be opened or broke.
    Connection { details: String },
    /// The stored session could not be read or written.
    Session { details: String },
    /// A token was not a decodable JWT.
    InvalidToken { details: String },
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration { details } => {
                write!(f, "invalid client configuration: {details}")
            }
            Self::Request { details } => write!(f, "request failed: {details}"),
            Self::Unauthorized => write!(f, "not signed in or session expired"),
            Self::Status { status, message } => {
                write!(f, "service returned {status}: {message}")
            }
            Self::Decode { details } => write!(f, "unexpected response: {details}"),
            Self::Connection { details } => write!(f, "event channel error: {details}"),
            Self::Session { details } => write!(f, "session storage error: {details}"),
            Self::InvalidToken { details } => write!(f, "invalid token: {details}"),
        }
    }
}

impl std::error::Error for ClientError {}

impl ClientError {
    /// Whether the caller should ask the user to sign in again.
    #[must_use]
    pub fn needs_login(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_display_includes_code() {
        let err = ClientError::Status {
            status: 404,
            message: "flow not found".to_string(),
        };
        assert_eq!(err.to_string(), "service returned 404: flow not found");
        assert!(!err.needs_login());
        assert!(ClientError::Unauthorized.needs_login());
    }
}
