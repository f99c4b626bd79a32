//! GitLab webhook service that keeps `ws-status::` labels on issues up to date.
//!
//! This crate provides:
//! - Webhook payload parsing and token verification
//! - The label decision engine for issue and merge request events
//! - An event dispatcher mapping outcomes to HTTP status codes
//! - A GitLab REST client implementing the [`GitLabApi`] capability
//! - HTTP server for webhook handling (standalone service)

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)] // Every GitLab call can fail

pub mod api;
pub mod config;
pub mod dispatcher;
pub mod engine;
pub mod error;
#[cfg(test)]
mod fake;
pub mod gitlab;
pub mod labels;
pub mod models;
pub mod server;
pub mod webhooks;

pub use api::{ClosesIssuesCursor, GitLabApi};
pub use config::Config;
pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use engine::{IssueOutcome, LabelEngine, MergeRequestOutcome};
pub use error::{ApiError, EngineError, WebhookError};
pub use gitlab::GitLabClient;
pub use labels::{has_status_label, StatusLabel, STATUS_NAMESPACE};
pub use models::*;
pub use webhooks::{verify_token, EventKind, IssueAttributes, MergeRequestAttributes};
