//! Service clients for classflow.
//!
//! This crate provides typed access to the services the flow editor talks to:
//!
//! - **Flows**: Load and save flow records, and the [`FlowStore`] seam used by autosave
//! - **Runner**: Start and retry executions, execution history, cron schedules
//! - **Events**: The runner's execution event channel
//! - **Auth**: Sign-in, sign-up, Google sign-in and the user profile
//! - **Session**: The bearer token shared by every client

pub mod auth;
pub mod config;
pub mod error;
pub mod events;
pub mod flows;
mod http;
pub mod runner;
pub mod session;

pub use auth::{AuthClient, UserProfile};
pub use config::ServiceEndpoints;
pub use error::ClientError;
pub use events::{EventStream, EventsClient};
pub use flows::{FlowClient, FlowRecord, FlowStore};
pub use runner::{CronJob, CronJobUpdate, ExecutionStatus, ExecutionSummary, NewCronJob, RunnerClient};
pub use session::{SessionContext, TokenClaims};
