//! Error types for the editor session.

use classflow_core::FlowId;
use std::fmt;

/// Errors from opening or driving an editor session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorError {
    /// The flow could not be fetched.
    LoadFailed { flow_id: FlowId, reason: String },
    /// The autosave task is gone.
    AutosaveStopped,
}

impl fmt::Display for EditorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LoadFailed { flow_id, reason } => {
                write!(f, "failed to load flow {flow_id}: {reason}")
            }
            Self::AutosaveStopped => write!(f, "autosave is no longer running"),
        }
    }
}

impl std::error::Error for EditorError {}
