//! CLI error types.

use std::fmt;

/// Reasons a command failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliError {
    /// Configuration could not be loaded.
    Config { details: String },
    /// A graph file could not be read or parsed.
    GraphFile { path: String, details: String },
    /// A service call failed.
    Service { details: String },
    /// The editor refused the change.
    Rejected { message: String },
    /// No template has this catalog key.
    UnknownTemplate { id: String },
    /// The flow has work that the command would replace.
    NeedsConfirmation,
    /// The flow cannot run as it stands.
    NotRunnable,
    /// A watched execution ended in failure.
    ExecutionFailed { execution_id: String, error: String },
    /// Changes were made but could not be saved.
    SaveFailed { message: String },
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config { details } => write!(f, "invalid configuration: {details}"),
            Self::GraphFile { path, details } => write!(f, "{path}: {details}"),
            Self::Service { details } => write!(f, "{details}"),
            Self::Rejected { message } => write!(f, "{message}"),
            Self::UnknownTemplate { id } => {
                write!(f, "unknown template '{id}' (see `classflow templates`)")
            }
            Self::NeedsConfirmation => {
                write!(f, "this flow already has nodes; pass --yes to replace them")
            }
            Self::NotRunnable => write!(f, "flow is not ready to run"),
            Self::ExecutionFailed {
                execution_id,
                error,
            } => write!(f, "execution {execution_id} failed: {error}"),
            Self::SaveFailed { message } => write!(f, "changes were not saved: {message}"),
        }
    }
}

impl std::error::Error for CliError {}
