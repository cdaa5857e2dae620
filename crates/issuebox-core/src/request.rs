//! Caller-facing request types
//!
//! These carry what a client asked for, before any validation. The
//! transition module turns an [`IssueUpdate`] into an
//! [`IssuePatch`](crate::IssuePatch) the store can apply.

use crate::issue::{Assignment, UserId};

/// Request to create a new issue
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewIssue {
    pub title: String,
    pub description: String,
    pub assignee: Option<UserId>,
}

impl NewIssue {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn assignee(mut self, id: UserId) -> Self {
        self.assignee = Some(id);
        self
    }
}

/// Partial update of an issue.
///
/// Every field is optional; `None` leaves the stored value unchanged.
/// `status` stays a raw string so it is classified alongside the other
/// transition checks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssueUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub assignee: Option<Assignment<UserId>>,
}

impl IssueUpdate {
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn assign(mut self, id: UserId) -> Self {
        self.assignee = Some(Assignment::Assign(id));
        self
    }

    pub fn unassign(mut self) -> Self {
        self.assignee = Some(Assignment::Unassign);
        self
    }

    /// Decode the wire form of an assignee field, where `0` clears it
    pub fn assignee_from_wire(id: UserId) -> Assignment<UserId> {
        if id == 0 {
            Assignment::Unassign
        } else {
            Assignment::Assign(id)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.assignee.is_none()
    }
}
