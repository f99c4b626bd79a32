//! Label decision engine.
//!
//! Decides which status label an issue or merge request event calls for and
//! writes it through the [`GitLabApi`] capability. Every label write is a
//! fetch, append, save round trip against GitLab with no rollback: when a
//! later call fails, labels already saved for the same event stay in place.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, info};

use crate::api::GitLabApi;
use crate::error::{ApiError, EngineError};
use crate::labels::{has_status_label, StatusLabel};
use crate::models::IssueRef;
use crate::webhooks::{IssueAction, IssueAttributes, MergeRequestAction, MergeRequestAttributes};

/// Result of handling an issue event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueOutcome {
    /// The label was appended and saved
    Labeled(StatusLabel),
    /// The issue already carries a status label; nothing written
    AlreadyLabeled,
    /// The action needs no label
    Ignored,
}

/// Result of handling a merge request event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeRequestOutcome {
    /// `in-progress` was applied to these issues, in cursor order
    Labeled(Vec<IssueRef>),
    /// The action needs no label
    Ignored,
}

/// Per-issue async locks used to serialize label updates.
#[derive(Debug, Default)]
pub struct IssueLocks {
    locks: Mutex<HashMap<(u64, u64), Arc<tokio::sync::Mutex<()>>>>,
}

impl IssueLocks {
    /// Wait for exclusive access to an issue.
    pub async fn lock(&self, project_id: u64, iid: u64) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            // Drop entries nobody is holding or waiting on
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks.entry((project_id, iid)).or_default().clone()
        };
        lock.lock_owned().await
    }

    /// Number of issues currently tracked.
    #[must_use]
    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no issue is currently tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Applies status labels in response to webhook events.
pub struct LabelEngine<A> {
    api: Arc<A>,
    locks: Option<IssueLocks>,
}

impl<A: GitLabApi> LabelEngine<A> {
    /// Create an engine with no per-issue serialization.
    pub fn new(api: Arc<A>) -> Self {
        Self { api, locks: None }
    }

    /// Create an engine that serializes updates per issue.
    ///
    /// While holding an issue's lock the engine also re-checks the labels
    /// GitLab currently reports, so concurrent re-deliveries of an `open`
    /// event cannot both append `unconfirmed`.
    pub fn with_issue_locks(api: Arc<A>) -> Self {
        Self {
            api,
            locks: Some(IssueLocks::default()),
        }
    }

    /// Whether per-issue serialization is enabled.
    #[must_use]
    pub fn serializes_issue_updates(&self) -> bool {
        self.locks.is_some()
    }

    /// Handle an `Issue Hook` event.
    pub async fn handle_issue(&self, attrs: &IssueAttributes) -> Result<IssueOutcome, EngineError> {
        match attrs.action {
            IssueAction::Open => self.issue_opened(attrs).await,
            IssueAction::Close => self.issue_closed(attrs).await,
            IssueAction::Other => {
                debug!(
                    project_id = attrs.project_id,
                    iid = attrs.iid,
                    "Issue action needs no label"
                );
                Ok(IssueOutcome::Ignored)
            }
        }
    }

    async fn issue_opened(&self, attrs: &IssueAttributes) -> Result<IssueOutcome, EngineError> {
        let label_titles = attrs.label_titles();
        debug!(labels = ?label_titles, "Existing labels");

        let access_level = self
            .api
            .member_access_level(attrs.project_id, attrs.author_id)
            .await?;
        debug!(%access_level, author_id = attrs.author_id, "Author access level");

        // Developer and above confirm their own issues regardless of labels
        if access_level.confirms_issues() {
            return self
                .apply_label(attrs.project_id, attrs.iid, StatusLabel::Confirmed, false)
                .await;
        }

        if has_status_label(&label_titles) {
            debug!(
                project_id = attrs.project_id,
                iid = attrs.iid,
                "Issue already has a status label"
            );
            return Ok(IssueOutcome::AlreadyLabeled);
        }

        self.apply_label(attrs.project_id, attrs.iid, StatusLabel::Unconfirmed, true)
            .await
    }

    async fn issue_closed(&self, attrs: &IssueAttributes) -> Result<IssueOutcome, EngineError> {
        let closed_by = self.api.closed_by(attrs.project_id, attrs.iid).await?;
        debug!(closed_by = ?closed_by, "Closed by");

        let label = match closed_by.first() {
            Some(reference) if reference.has_reference_marker => StatusLabel::Fixed,
            _ => StatusLabel::Closed,
        };
        self.apply_label(attrs.project_id, attrs.iid, label, false)
            .await
    }

    /// Handle a `Merge Request Hook` event.
    ///
    /// Each closing issue is fetched from its own project, which may differ
    /// from the merge request's target project.
    pub async fn handle_merge_request(
        &self,
        attrs: &MergeRequestAttributes,
    ) -> Result<MergeRequestOutcome, EngineError> {
        if attrs.action != MergeRequestAction::Open {
            debug!(
                project_id = attrs.target_project_id,
                mr_iid = attrs.iid,
                "Merge request action needs no label"
            );
            return Ok(MergeRequestOutcome::Ignored);
        }

        let mut cursor = self
            .api
            .closes_issues(attrs.target_project_id, attrs.iid)
            .await?;
        let total = cursor.total();
        info!(
            project_id = attrs.target_project_id,
            mr_iid = attrs.iid,
            total = ?total,
            "Merge request closes issues"
        );

        let mut labeled = Vec::new();
        if let Some(expected) = total {
            for yielded in 0..expected {
                let Some(issue) = cursor.next().await? else {
                    return Err(ApiError::CursorExhausted { expected, yielded }.into());
                };
                self.apply_label(issue.project_id, issue.iid, StatusLabel::InProgress, false)
                    .await?;
                labeled.push(issue);
            }
        } else {
            while let Some(issue) = cursor.next().await? {
                self.apply_label(issue.project_id, issue.iid, StatusLabel::InProgress, false)
                    .await?;
                labeled.push(issue);
            }
        }

        Ok(MergeRequestOutcome::Labeled(labeled))
    }

    /// Fetch the issue, append `label` and save it.
    ///
    /// With issue locks enabled and `only_if_unlabeled` set, the label is
    /// skipped when GitLab already reports a status label on the issue.
    async fn apply_label(
        &self,
        project_id: u64,
        iid: u64,
        label: StatusLabel,
        only_if_unlabeled: bool,
    ) -> Result<IssueOutcome, EngineError> {
        let _guard = match &self.locks {
            Some(locks) => Some(locks.lock(project_id, iid).await),
            None => None,
        };

        let mut issue = self.api.issue(project_id, iid).await?;
        if only_if_unlabeled && self.locks.is_some() && has_status_label(&issue.labels) {
            debug!(project_id, iid, "Status label landed concurrently");
            return Ok(IssueOutcome::AlreadyLabeled);
        }

        info!(project_id, iid, %label, "Set label");
        issue.append_label(label);
        self.api.save_issue(&issue).await?;
        Ok(IssueOutcome::Labeled(label))
    }
}
