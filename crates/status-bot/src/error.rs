//! Error types for the status bot.

use thiserror::Error;

/// Errors returned by a [`GitLabApi`](crate::api::GitLabApi) implementation.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed before a response arrived
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// GitLab answered with a non-success status
    #[error("GitLab API error: {status} - {body}")]
    Status { status: u16, body: String },

    /// The requested project, issue, member or merge request does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Response body could not be decoded
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// Closes-issues cursor ran dry before reaching its reported total
    #[error("Closes-issues cursor ended after {yielded} of {expected} issues")]
    CursorExhausted { expected: u64, yielded: u64 },
}

/// Errors raised while parsing an inbound webhook.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// A required key is missing or has the wrong type
    #[error("Malformed payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),
}

/// Errors that abort a label decision.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A capability call failed; earlier writes for the same event are kept
    #[error(transparent)]
    Api(#[from] ApiError),
}
