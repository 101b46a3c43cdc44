//! Editing session for a single classflow flow.
//!
//! - **Session**: Loads a flow, routes canvas actions through the reducer
//!   and reports refusals
//! - **Autosave**: Debounced, versioned saves through a [`FlowStore`]
//! - **Notices**: Short-lived messages for the user
//!
//! [`FlowStore`]: classflow_client::FlowStore

pub mod autosave;
pub mod config;
pub mod error;
pub mod notice;
pub mod session;

pub use autosave::{Autosave, SaveState, Snapshot};
pub use config::AutosaveConfig;
pub use error::EditorError;
pub use notice::{Notice, NoticeLevel};
pub use session::{EditorSession, TemplateOutcome};
