//! Event dispatcher.
//!
//! Classifies a webhook by event kind, parses its attributes and hands it to
//! the [`LabelEngine`]. Failures are logged here and collapsed into a single
//! generic outcome; no error detail reaches the caller.

use axum::http::StatusCode;
use serde_json::Value;
use tracing::{debug, error, info};

use crate::api::GitLabApi;
use crate::engine::LabelEngine;
use crate::webhooks::{EventKind, IssueAttributes, MergeRequestAttributes};

/// Coarse result of handling one webhook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Event handled (labels written or nothing to do)
    Accepted,
    /// Event kind is not handled by this service
    Unsupported,
    /// Malformed payload or GitLab call failed
    Failed,
}

impl DispatchOutcome {
    /// HTTP status for this outcome.
    #[must_use]
    pub const fn status(self) -> StatusCode {
        match self {
            Self::Accepted => StatusCode::OK,
            Self::Unsupported => StatusCode::NOT_IMPLEMENTED,
            Self::Failed => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Response body for this outcome.
    #[must_use]
    pub const fn body(self) -> &'static str {
        match self {
            Self::Accepted => "OK",
            Self::Unsupported => "Event currently not supported",
            Self::Failed => "Something went wrong",
        }
    }
}

/// Routes webhook events to the label engine.
pub struct Dispatcher<A> {
    engine: LabelEngine<A>,
}

impl<A: GitLabApi> Dispatcher<A> {
    /// Create a dispatcher around an engine.
    pub fn new(engine: LabelEngine<A>) -> Self {
        Self { engine }
    }

    /// The underlying engine.
    pub fn engine(&self) -> &LabelEngine<A> {
        &self.engine
    }

    /// Handle one webhook payload.
    pub async fn dispatch(&self, kind: &EventKind, payload: &Value) -> DispatchOutcome {
        match kind {
            EventKind::Issue => self.issue_hook(payload).await,
            EventKind::MergeRequest => self.merge_request_hook(payload).await,
            EventKind::Unsupported(name) => {
                info!(event = %name, "Event currently not supported");
                DispatchOutcome::Unsupported
            }
        }
    }

    async fn issue_hook(&self, payload: &Value) -> DispatchOutcome {
        debug!(%payload, "Issue Hook");
        let attrs = match IssueAttributes::from_payload(payload) {
            Ok(attrs) => attrs,
            Err(e) => {
                error!(error = %e, "Unexpected error in Issue Hook");
                return DispatchOutcome::Failed;
            }
        };

        match self.engine.handle_issue(&attrs).await {
            Ok(outcome) => {
                debug!(
                    project_id = attrs.project_id,
                    iid = attrs.iid,
                    ?outcome,
                    "Issue Hook handled"
                );
                DispatchOutcome::Accepted
            }
            Err(e) => {
                error!(
                    project_id = attrs.project_id,
                    iid = attrs.iid,
                    error = %e,
                    "Unexpected error in Issue Hook"
                );
                DispatchOutcome::Failed
            }
        }
    }

    async fn merge_request_hook(&self, payload: &Value) -> DispatchOutcome {
        debug!(%payload, "Merge Request Hook");
        let attrs = match MergeRequestAttributes::from_payload(payload) {
            Ok(attrs) => attrs,
            Err(e) => {
                error!(error = %e, "Unexpected error in Merge Request Hook");
                return DispatchOutcome::Failed;
            }
        };

        match self.engine.handle_merge_request(&attrs).await {
            Ok(outcome) => {
                debug!(
                    project_id = attrs.target_project_id,
                    mr_iid = attrs.iid,
                    ?outcome,
                    "Merge Request Hook handled"
                );
                DispatchOutcome::Accepted
            }
            Err(e) => {
                error!(
                    project_id = attrs.target_project_id,
                    mr_iid = attrs.iid,
                    error = %e,
                    "Unexpected error in Merge Request Hook"
                );
                DispatchOutcome::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::FakeGitLab;
    use crate::models::{AccessLevel, IssueRef};
    use serde_json::json;
    use std::sync::Arc;

    fn dispatcher(api: &Arc<FakeGitLab>) -> Dispatcher<FakeGitLab> {
        Dispatcher::new(LabelEngine::new(Arc::clone(api)))
    }

    #[test]
    fn test_outcome_mapping() {
        assert_eq!(DispatchOutcome::Accepted.status(), StatusCode::OK);
        assert_eq!(DispatchOutcome::Unsupported.status().as_u16(), 501);
        assert_eq!(DispatchOutcome::Failed.status().as_u16(), 500);
        assert_eq!(DispatchOutcome::Accepted.body(), "OK");
    }

    #[tokio::test]
    async fn test_unsupported_event_makes_no_calls() {
        let api = Arc::new(FakeGitLab::new());
        let outcome = dispatcher(&api)
            .dispatch(
                &EventKind::from_header("Push Hook"),
                &json!({"object_attributes": {}}),
            )
            .await;

        assert_eq!(outcome, DispatchOutcome::Unsupported);
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_issue_payload_fails() {
        let api = Arc::new(FakeGitLab::new());
        let outcome = dispatcher(&api)
            .dispatch(&EventKind::Issue, &json!({"object_attributes": {"iid": 1}}))
            .await;

        assert_eq!(outcome, DispatchOutcome::Failed);
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_merge_request_payload_fails() {
        let api = Arc::new(FakeGitLab::new());
        let outcome = dispatcher(&api)
            .dispatch(&EventKind::MergeRequest, &json!([]))
            .await;
        assert_eq!(outcome, DispatchOutcome::Failed);
    }

    #[tokio::test]
    async fn test_issue_hook_accepted() {
        let api = Arc::new(
            FakeGitLab::new()
                .with_member(3, AccessLevel::Reporter)
                .with_issue(1, 2, &[]),
        );
        let payload = json!({
            "object_attributes": {
                "project_id": 1, "iid": 2, "action": "open", "author_id": 3, "labels": []
            }
        });

        let outcome = dispatcher(&api).dispatch(&EventKind::Issue, &payload).await;
        assert_eq!(outcome, DispatchOutcome::Accepted);
        assert_eq!(api.labels(1, 2), vec!["ws-status::unconfirmed"]);
    }

    #[tokio::test]
    async fn test_ignored_action_is_accepted() {
        let api = Arc::new(FakeGitLab::new());
        let payload = json!({
            "object_attributes": {
                "project_id": 1, "iid": 2, "action": "update", "author_id": 3, "labels": []
            }
        });
        let outcome = dispatcher(&api).dispatch(&EventKind::Issue, &payload).await;
        assert_eq!(outcome, DispatchOutcome::Accepted);
    }

    #[tokio::test]
    async fn test_capability_failure_fails() {
        // Issue is unknown to GitLab
        let api = Arc::new(FakeGitLab::new().with_member(3, AccessLevel::Owner));
        let payload = json!({
            "object_attributes": {
                "project_id": 1, "iid": 2, "action": "open", "author_id": 3, "labels": []
            }
        });
        let outcome = dispatcher(&api).dispatch(&EventKind::Issue, &payload).await;
        assert_eq!(outcome, DispatchOutcome::Failed);
    }

    #[tokio::test]
    async fn test_merge_request_hook_accepted() {
        let api = Arc::new(
            FakeGitLab::new()
                .with_issue(1, 8, &[])
                .with_closes_issues(1, 4, Some(1), vec![IssueRef { project_id: 1, iid: 8 }]),
        );
        let payload = json!({
            "object_attributes": {"target_project_id": 1, "iid": 4, "action": "open"}
        });

        let outcome = dispatcher(&api)
            .dispatch(&EventKind::MergeRequest, &payload)
            .await;
        assert_eq!(outcome, DispatchOutcome::Accepted);
        assert_eq!(api.labels(1, 8), vec!["ws-status::in-progress"]);
    }
}
