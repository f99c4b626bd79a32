//! Status label vocabulary.

use std::fmt;

/// Namespace shared by every status label.
pub const STATUS_NAMESPACE: &str = "ws-status::";

/// Triage state rendered as a namespaced GitLab label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusLabel {
    /// Reported by a Developer or above
    Confirmed,
    /// Reported by someone below Developer
    Unconfirmed,
    /// An open merge request will close the issue
    InProgress,
    /// Closed by a merge request
    Fixed,
    /// Closed without an identifiable merge request
    Closed,
}

impl StatusLabel {
    /// All status labels, in lifecycle order.
    pub const ALL: [Self; 5] = [
        Self::Unconfirmed,
        Self::Confirmed,
        Self::InProgress,
        Self::Fixed,
        Self::Closed,
    ];

    /// Full label title, including the namespace.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Confirmed => "ws-status::confirmed",
            Self::Unconfirmed => "ws-status::unconfirmed",
            Self::InProgress => "ws-status::in-progress",
            Self::Fixed => "ws-status::fixed",
            Self::Closed => "ws-status::closed",
        }
    }
}

impl fmt::Display for StatusLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Check whether any label carries the status namespace.
///
/// The comparison is a case-insensitive substring match, so
/// `"WS-Status::Confirmed"` and `"team/ws-status::x"` both count.
#[must_use]
pub fn has_status_label<S: AsRef<str>>(labels: &[S]) -> bool {
    labels
        .iter()
        .any(|title| title.as_ref().to_lowercase().contains(STATUS_NAMESPACE))
}
