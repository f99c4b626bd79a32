//! GitLab capability consumed by the label engine.
//!
//! The engine only sees these traits; [`GitLabClient`](crate::gitlab::GitLabClient)
//! implements them over the REST API and tests use an in-memory fake.

use async_trait::async_trait;

use crate::error::ApiError;
use crate::models::{AccessLevel, ClosedByReference, EditableIssue, IssueRef};

/// Read/write access to the GitLab project data the engine needs.
#[async_trait]
pub trait GitLabApi: Send + Sync {
    /// Access level of a project member.
    async fn member_access_level(&self, project_id: u64, user_id: u64)
        -> Result<AccessLevel, ApiError>;

    /// Fetch an issue with its current labels.
    async fn issue(&self, project_id: u64, iid: u64) -> Result<EditableIssue, ApiError>;

    /// Merge requests (or other entities) that closed an issue.
    async fn closed_by(&self, project_id: u64, iid: u64)
        -> Result<Vec<ClosedByReference>, ApiError>;

    /// Persist the issue's label list.
    async fn save_issue(&self, issue: &EditableIssue) -> Result<(), ApiError>;

    /// Open a cursor over the issues a merge request will close when merged.
    async fn closes_issues(
        &self,
        project_id: u64,
        mr_iid: u64,
    ) -> Result<Box<dyn ClosesIssuesCursor>, ApiError>;
}

/// Forward-only cursor over a merge request's closes-list.
///
/// Each call to [`next`](Self::next) may fetch another page. The cursor
/// cannot be rewound.
#[async_trait]
pub trait ClosesIssuesCursor: Send {
    /// Total number of issues reported by GitLab, if known.
    fn total(&self) -> Option<u64>;

    /// Next issue, or `None` once the list is exhausted.
    async fn next(&mut self) -> Result<Option<IssueRef>, ApiError>;
}
