//! GitLab entity type definitions.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::labels::StatusLabel;

/// Project member access level, ordered by privilege.
///
/// Discriminants match GitLab's integer `access_level` values. Values
/// GitLab adds later decode to the closest known level below them, so
/// comparisons agree with comparing the raw integers against the known
/// thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "u16", into = "u16")]
pub enum AccessLevel {
    NoAccess = 0,
    MinimalAccess = 5,
    Guest = 10,
    Planner = 15,
    Reporter = 20,
    Developer = 30,
    Maintainer = 40,
    Owner = 50,
}

impl AccessLevel {
    /// Known levels, lowest first.
    const LEVELS: [Self; 8] = [
        Self::NoAccess,
        Self::MinimalAccess,
        Self::Guest,
        Self::Planner,
        Self::Reporter,
        Self::Developer,
        Self::Maintainer,
        Self::Owner,
    ];

    /// Whether issues opened by a member at this level are confirmed on arrival.
    #[must_use]
    pub fn confirms_issues(self) -> bool {
        self >= Self::Developer
    }
}

impl From<u16> for AccessLevel {
    fn from(value: u16) -> Self {
        Self::LEVELS
            .iter()
            .rev()
            .copied()
            .find(|level| u16::from(*level) <= value)
            .unwrap_or(Self::NoAccess)
    }
}

impl From<AccessLevel> for u16 {
    fn from(level: AccessLevel) -> Self {
        level as u16
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NoAccess => "no access",
            Self::MinimalAccess => "minimal access",
            Self::Guest => "guest",
            Self::Planner => "planner",
            Self::Reporter => "reporter",
            Self::Developer => "developer",
            Self::Maintainer => "maintainer",
            Self::Owner => "owner",
        };
        f.write_str(name)
    }
}

/// Project member as returned by `GET /projects/:id/members/:user_id`.
#[derive(Debug, Clone, Deserialize)]
pub struct Member {
    /// User ID
    pub id: u64,
    /// Access level in the project
    pub access_level: AccessLevel,
}

/// One entry of an issue's `closed_by` list.
///
/// GitLab returns the merge requests that closed the issue. Only the
/// presence of a `reference` key matters for labeling.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "Map<String, Value>")]
pub struct ClosedByReference {
    /// Merge request IID, when present
    pub iid: Option<u64>,
    /// Whether the entry carries a `reference` key
    pub has_reference_marker: bool,
}

impl From<Map<String, Value>> for ClosedByReference {
    fn from(fields: Map<String, Value>) -> Self {
        Self {
            iid: fields.get("iid").and_then(Value::as_u64),
            has_reference_marker: fields.contains_key("reference"),
        }
    }
}

/// Issue yielded by a merge request's closes-list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub struct IssueRef {
    /// Project the issue lives in
    pub project_id: u64,
    /// Project-scoped issue number
    pub iid: u64,
}

/// Issue fetched for a label read-modify-write.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EditableIssue {
    /// Project the issue lives in
    pub project_id: u64,
    /// Project-scoped issue number
    pub iid: u64,
    /// Current label titles
    #[serde(default)]
    pub labels: Vec<String>,
}

impl EditableIssue {
    /// Append a status label. Existing labels are never removed or deduplicated.
    pub fn append_label(&mut self, label: StatusLabel) {
        self.labels.push(label.as_str().to_string());
    }
}
