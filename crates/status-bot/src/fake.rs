//! In-memory [`GitLabApi`] used by unit tests.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use crate::api::{ClosesIssuesCursor, GitLabApi};
use crate::error::ApiError;
use crate::models::{AccessLevel, ClosedByReference, EditableIssue, IssueRef};

/// Capability call recorded by the fake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    MemberAccessLevel(u64, u64),
    Issue(u64, u64),
    ClosedBy(u64, u64),
    Save(u64, u64, Vec<String>),
    ClosesIssues(u64, u64),
    CursorNext,
}

#[derive(Default)]
struct State {
    members: HashMap<u64, AccessLevel>,
    issues: HashMap<(u64, u64), Vec<String>>,
    closed_by: HashMap<(u64, u64), Vec<ClosedByReference>>,
    closes: HashMap<(u64, u64), (Option<u64>, Vec<IssueRef>)>,
    failing_saves: Vec<(u64, u64)>,
    calls: Vec<Call>,
}

#[derive(Default)]
pub(crate) struct FakeGitLab {
    state: Arc<Mutex<State>>,
}

impl FakeGitLab {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_member(self, user_id: u64, level: AccessLevel) -> Self {
        self.state.lock().unwrap().members.insert(user_id, level);
        self
    }

    pub(crate) fn with_issue(self, project_id: u64, iid: u64, labels: &[&str]) -> Self {
        self.state.lock().unwrap().issues.insert(
            (project_id, iid),
            labels.iter().map(ToString::to_string).collect(),
        );
        self
    }

    pub(crate) fn with_closed_by(
        self,
        project_id: u64,
        iid: u64,
        refs: Vec<ClosedByReference>,
    ) -> Self {
        self.state
            .lock()
            .unwrap()
            .closed_by
            .insert((project_id, iid), refs);
        self
    }

    pub(crate) fn with_closes_issues(
        self,
        project_id: u64,
        mr_iid: u64,
        total: Option<u64>,
        refs: Vec<IssueRef>,
    ) -> Self {
        self.state
            .lock()
            .unwrap()
            .closes
            .insert((project_id, mr_iid), (total, refs));
        self
    }

    pub(crate) fn failing_save(self, project_id: u64, iid: u64) -> Self {
        self.state
            .lock()
            .unwrap()
            .failing_saves
            .push((project_id, iid));
        self
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub(crate) fn saves(&self) -> Vec<(u64, u64, Vec<String>)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Save(project_id, iid, labels) => Some((project_id, iid, labels)),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn cursor_reads(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| **call == Call::CursorNext)
            .count()
    }

    pub(crate) fn labels(&self, project_id: u64, iid: u64) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .issues
            .get(&(project_id, iid))
            .cloned()
            .unwrap_or_default()
    }

    fn record(&self, call: Call) {
        self.state.lock().unwrap().calls.push(call);
    }
}

#[async_trait]
impl GitLabApi for FakeGitLab {
    async fn member_access_level(
        &self,
        project_id: u64,
        user_id: u64,
    ) -> Result<AccessLevel, ApiError> {
        self.record(Call::MemberAccessLevel(project_id, user_id));
        self.state
            .lock()
            .unwrap()
            .members
            .get(&user_id)
            .copied()
            .ok_or_else(|| ApiError::NotFound(format!("member {user_id}")))
    }

    async fn issue(&self, project_id: u64, iid: u64) -> Result<EditableIssue, ApiError> {
        self.record(Call::Issue(project_id, iid));
        let labels = self
            .state
            .lock()
            .unwrap()
            .issues
            .get(&(project_id, iid))
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("issue {project_id}#{iid}")))?;
        // Hand control back between the read and the caller's save, like a real round trip
        tokio::task::yield_now().await;
        Ok(EditableIssue {
            project_id,
            iid,
            labels,
        })
    }

    async fn closed_by(
        &self,
        project_id: u64,
        iid: u64,
    ) -> Result<Vec<ClosedByReference>, ApiError> {
        self.record(Call::ClosedBy(project_id, iid));
        Ok(self
            .state
            .lock()
            .unwrap()
            .closed_by
            .get(&(project_id, iid))
            .cloned()
            .unwrap_or_default())
    }

    async fn save_issue(&self, issue: &EditableIssue) -> Result<(), ApiError> {
        self.record(Call::Save(issue.project_id, issue.iid, issue.labels.clone()));
        let mut state = self.state.lock().unwrap();
        if state.failing_saves.contains(&(issue.project_id, issue.iid)) {
            return Err(ApiError::Status {
                status: 500,
                body: "save failed".to_string(),
            });
        }
        state
            .issues
            .insert((issue.project_id, issue.iid), issue.labels.clone());
        Ok(())
    }

    async fn closes_issues(
        &self,
        project_id: u64,
        mr_iid: u64,
    ) -> Result<Box<dyn ClosesIssuesCursor>, ApiError> {
        self.record(Call::ClosesIssues(project_id, mr_iid));
        let (total, refs) = self
            .state
            .lock()
            .unwrap()
            .closes
            .get(&(project_id, mr_iid))
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("merge request {project_id}!{mr_iid}")))?;
        Ok(Box::new(FakeCursor {
            state: Arc::clone(&self.state),
            total,
            items: refs.into(),
        }))
    }
}

struct FakeCursor {
    state: Arc<Mutex<State>>,
    total: Option<u64>,
    items: VecDeque<IssueRef>,
}

#[async_trait]
impl ClosesIssuesCursor for FakeCursor {
    fn total(&self) -> Option<u64> {
        self.total
    }

    async fn next(&mut self) -> Result<Option<IssueRef>, ApiError> {
        self.state.lock().unwrap().calls.push(Call::CursorNext);
        Ok(self.items.pop_front())
    }
}
