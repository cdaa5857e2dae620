//! Issue data model for issuebox
//!
//! Issues reference their assignee through a shared handle on the seeded
//! [`User`] record rather than owning a copy of it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub type IssueId = u64;
pub type UserId = u64;

/// Issue status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    #[default]
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

impl Status {
    pub const ALL: [Status; 4] = [
        Status::Pending,
        Status::InProgress,
        Status::Completed,
        Status::Cancelled,
    ];

    /// No further edits are accepted once an issue reaches this status
    pub fn is_terminal(&self) -> bool {
        matches!(self, Status::Completed | Status::Cancelled)
    }

    /// Whether an issue may sit in this status with nobody assigned
    pub fn allows_unassigned(&self) -> bool {
        matches!(self, Status::Pending | Status::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pending => "PENDING",
            Status::InProgress => "IN_PROGRESS",
            Status::Completed => "COMPLETED",
            Status::Cancelled => "CANCELLED",
        }
    }
}

impl std::str::FromStr for Status {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Status::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| crate::Error::InvalidStatus(s.to_string()))
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A member of the fixed user table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
}

impl User {
    pub fn new(id: UserId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Assignee change carried by a partial update.
///
/// Wrapped in an `Option` by callers: `None` leaves the assignee alone,
/// `Some(Unassign)` clears it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Assignment<T> {
    Assign(T),
    Unassign,
}

impl<T> Assignment<T> {
    pub fn is_assign(&self) -> bool {
        matches!(self, Assignment::Assign(_))
    }
}

/// Status an issue ends up in after an assignee change and an optional
/// explicit status are applied, in that order.
///
/// Unassigning always resets to `Pending`; assigning only advances a
/// `Pending` issue when no explicit status is given. An explicit status is
/// applied last and wins.
pub fn resulting_status<T>(
    current: Status,
    assignee: Option<&Assignment<T>>,
    explicit: Option<Status>,
) -> Status {
    let mut status = current;
    match assignee {
        Some(Assignment::Unassign) => status = Status::Pending,
        Some(Assignment::Assign(_)) if status == Status::Pending && explicit.is_none() => {
            status = Status::InProgress
        }
        _ => {}
    }
    explicit.unwrap_or(status)
}

/// Validated partial update, ready to be applied by the store
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IssuePatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub assignee: Option<Assignment<Arc<User>>>,
    pub status: Option<Status>,
}

/// Core issue structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub id: IssueId,

    pub title: String,

    #[serde(default)]
    pub description: String,

    pub status: Status,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<Arc<User>>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Issue {
    /// Create a new issue; the initial status follows from whether
    /// anyone is assigned.
    pub fn new(
        id: IssueId,
        title: String,
        description: String,
        assignee: Option<Arc<User>>,
    ) -> Self {
        let now = Utc::now();
        let status = if assignee.is_some() {
            Status::InProgress
        } else {
            Status::Pending
        };
        Self {
            id,
            title,
            description,
            status,
            assignee,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_assignee(&self) -> bool {
        self.assignee.is_some()
    }

    pub fn assignee_id(&self) -> Option<UserId> {
        self.assignee.as_ref().map(|user| user.id)
    }

    /// Apply a patch field by field: title, description, assignee, status.
    ///
    /// No legality checks happen here.
    pub fn apply(&mut self, patch: &IssuePatch) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(description) = &patch.description {
            self.description = description.clone();
        }

        self.status = resulting_status(self.status, patch.assignee.as_ref(), patch.status);
        match &patch.assignee {
            Some(Assignment::Assign(user)) => self.assignee = Some(Arc::clone(user)),
            Some(Assignment::Unassign) => self.assignee = None,
            None => {}
        }

        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now().max(self.created_at);
    }
}

impl std::fmt::Display for Issue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{} [{}] {}", self.id, self.status, self.title)?;
        if let Some(user) = &self.assignee {
            write!(f, " @{}", user.name)?;
        }
        Ok(())
    }
}
