//! Webhook payload parsing and token verification.

use serde::Deserialize;
use serde_json::Value;
use subtle::ConstantTimeEq;

use crate::error::WebhookError;

/// Header carrying the event kind.
pub const EVENT_HEADER: &str = "X-Gitlab-Event";
/// Header carrying the shared webhook secret.
pub const TOKEN_HEADER: &str = "X-Gitlab-Token";

/// Verify the webhook token against the configured secret.
///
/// # Returns
/// `true` only on an exact match, compared in constant time
#[must_use]
pub fn verify_token(provided: &str, expected: &str) -> bool {
    provided.as_bytes().ct_eq(expected.as_bytes()).into()
}

/// Event kind taken from the `X-Gitlab-Event` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// `Issue Hook`
    Issue,
    /// `Merge Request Hook`
    MergeRequest,
    /// Any other hook; answered with 501
    Unsupported(String),
}

impl EventKind {
    /// Classify a header value.
    #[must_use]
    pub fn from_header(value: &str) -> Self {
        match value {
            "Issue Hook" => Self::Issue,
            "Merge Request Hook" => Self::MergeRequest,
            other => Self::Unsupported(other.to_string()),
        }
    }
}

/// Issue webhook action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueAction {
    /// Issue was opened
    Open,
    /// Issue was closed
    Close,
    /// Update, reopen, etc.
    #[serde(other)]
    Other,
}

/// Merge request webhook action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeRequestAction {
    /// Merge request was opened
    Open,
    /// Update, merge, close, etc.
    #[serde(other)]
    Other,
}

/// Label entry in an issue hook payload
#[derive(Debug, Clone, Deserialize)]
pub struct HookLabel {
    /// Label title
    pub title: String,
}

/// `object_attributes` of an `Issue Hook` payload.
#[derive(Debug, Clone, Deserialize)]
pub struct IssueAttributes {
    /// Project ID
    pub project_id: u64,
    /// Project-scoped issue number
    pub iid: u64,
    /// What happened to the issue
    pub action: IssueAction,
    /// Labels present when the hook fired
    pub labels: Vec<HookLabel>,
    /// User who opened the issue
    pub author_id: u64,
}

impl IssueAttributes {
    /// Parse from a full webhook payload.
    pub fn from_payload(payload: &Value) -> Result<Self, WebhookError> {
        let envelope = HookEnvelope::<Self>::deserialize(payload)?;
        Ok(envelope.object_attributes)
    }

    /// Label titles present when the hook fired.
    #[must_use]
    pub fn label_titles(&self) -> Vec<&str> {
        self.labels.iter().map(|l| l.title.as_str()).collect()
    }
}

/// `object_attributes` of a `Merge Request Hook` payload.
#[derive(Debug, Clone, Deserialize)]
pub struct MergeRequestAttributes {
    /// Project the merge request targets
    pub target_project_id: u64,
    /// Project-scoped merge request number
    pub iid: u64,
    /// What happened to the merge request
    pub action: MergeRequestAction,
}

impl MergeRequestAttributes {
    /// Parse from a full webhook payload.
    pub fn from_payload(payload: &Value) -> Result<Self, WebhookError> {
        let envelope = HookEnvelope::<Self>::deserialize(payload)?;
        Ok(envelope.object_attributes)
    }
}

#[derive(Deserialize)]
struct HookEnvelope<T> {
    object_attributes: T,
}
