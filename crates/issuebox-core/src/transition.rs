//! Transition rules for issue status and assignee changes
//!
//! Everything here is a pure function of the current issue, the request
//! and the user table. The store runs these checks under its write lock
//! so the verdict cannot go stale before the change is applied.

use crate::issue::{Assignment, Issue, IssuePatch, Status, User, UserId, resulting_status};
use crate::request::{IssueUpdate, NewIssue};
use crate::{Error, Result};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Read-only lookup of users by id
pub trait UserDirectory {
    fn user(&self, id: UserId) -> Option<Arc<User>>;
}

impl UserDirectory for BTreeMap<UserId, Arc<User>> {
    fn user(&self, id: UserId) -> Option<Arc<User>> {
        self.get(&id).cloned()
    }
}

impl UserDirectory for HashMap<UserId, Arc<User>> {
    fn user(&self, id: UserId) -> Option<Arc<User>> {
        self.get(&id).cloned()
    }
}

fn resolve(users: &impl UserDirectory, id: UserId) -> Result<Arc<User>> {
    users.user(id).ok_or(Error::UnknownUser(id))
}

fn require_title(title: &str) -> Result<()> {
    if title.is_empty() {
        return Err(Error::MalformedRequest("title must not be empty".into()));
    }
    Ok(())
}

/// Check a creation request, returning the resolved assignee if one was
/// requested.
pub fn check_create(req: &NewIssue, users: &impl UserDirectory) -> Result<Option<Arc<User>>> {
    require_title(&req.title)?;
    req.assignee.map(|id| resolve(users, id)).transpose()
}

/// Check a partial update against the issue's current state.
///
/// Rejections, in order: unknown assignee, terminal issue, unrecognized
/// status, empty title, and finally a resulting status that needs an
/// assignee the issue will not have.
pub fn check_update(
    issue: &Issue,
    req: &IssueUpdate,
    users: &impl UserDirectory,
) -> Result<IssuePatch> {
    let assignee = match &req.assignee {
        Some(Assignment::Assign(id)) => Some(Assignment::Assign(resolve(users, *id)?)),
        Some(Assignment::Unassign) => Some(Assignment::Unassign),
        None => None,
    };

    if issue.status.is_terminal() {
        return Err(Error::Terminal {
            id: issue.id,
            status: issue.status,
        });
    }

    let status = req
        .status
        .as_deref()
        .map(str::parse::<Status>)
        .transpose()?;

    if let Some(title) = &req.title {
        require_title(title)?;
    }

    let will_have_assignee = match &assignee {
        Some(change) => change.is_assign(),
        None => issue.has_assignee(),
    };
    let next = resulting_status(issue.status, assignee.as_ref(), status);
    if !next.allows_unassigned() && !will_have_assignee {
        return Err(Error::AssigneeRequired(next));
    }

    Ok(IssuePatch {
        title: req.title.clone(),
        description: req.description.clone(),
        assignee,
        status,
    })
}
