//! Core types shared by the classflow crates.
//!
//! This crate provides the identifier types for records owned by the
//! external services (flows, users, executions, cron jobs) and the
//! rootcause-based `Result` alias used at I/O boundaries.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{CronJobId, ExecutionId, FlowId, ParseIdError, UserId};
