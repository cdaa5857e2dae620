//! In-memory issue store
//!
//! Nothing is persisted; the store lives as long as the process. Issues sit
//! behind a single reader/writer lock. The user table is fixed at
//! construction and read without locking.

use crate::config::{Config, default_users};
use crate::issue::{Issue, IssueId, IssuePatch, Status, User, UserId};
use crate::request::{IssueUpdate, NewIssue};
use crate::transition;
use crate::{Error, Result};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Mutable part of the store, guarded by the lock
#[derive(Debug)]
struct State {
    issues: BTreeMap<IssueId, Issue>,
    next_id: IssueId,
}

impl State {
    fn insert(&mut self, title: String, description: String, assignee: Option<Arc<User>>) -> Issue {
        let id = self.next_id;
        self.next_id += 1;

        let issue = Issue::new(id, title, description, assignee);
        self.issues.insert(id, issue.clone());
        tracing::debug!(issue_id = id, status = %issue.status, "issue created");
        issue
    }

    fn apply(&mut self, id: IssueId, patch: &IssuePatch) -> Option<Issue> {
        let issue = self.issues.get_mut(&id)?;
        issue.apply(patch);
        tracing::debug!(issue_id = id, status = %issue.status, "issue updated");
        Some(issue.clone())
    }
}

/// Shared issue store
///
/// Reads return owned snapshots; callers never hold references into the
/// store.
#[derive(Debug)]
pub struct Store {
    users: BTreeMap<UserId, Arc<User>>,
    state: RwLock<State>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new(default_users())
    }
}

impl Store {
    /// Create an empty store with a fixed user table
    pub fn new(users: impl IntoIterator<Item = User>) -> Self {
        let users = users
            .into_iter()
            .map(|user| (user.id, Arc::new(user)))
            .collect();
        Self {
            users,
            state: RwLock::new(State {
                issues: BTreeMap::new(),
                next_id: 1,
            }),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.users.iter().cloned())
    }

    /// Get a user by ID
    pub fn get_user(&self, id: UserId) -> Option<Arc<User>> {
        self.users.get(&id).cloned()
    }

    /// All users, ordered by ID
    pub fn users(&self) -> Vec<Arc<User>> {
        self.users.values().cloned().collect()
    }

    /// Snapshot of every issue, ordered by ID
    pub fn all_issues(&self) -> Vec<Issue> {
        self.state.read().issues.values().cloned().collect()
    }

    /// Snapshot of the issues currently in `status`
    pub fn issues_by_status(&self, status: Status) -> Vec<Issue> {
        self.state
            .read()
            .issues
            .values()
            .filter(|i| i.status == status)
            .cloned()
            .collect()
    }

    /// Get an issue by ID
    pub fn get_issue(&self, id: IssueId) -> Option<Issue> {
        self.state.read().issues.get(&id).cloned()
    }

    pub fn contains_issue(&self, id: IssueId) -> bool {
        self.state.read().issues.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.state.read().issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Create an issue without validation.
    ///
    /// An assignee id that does not resolve leaves the issue unassigned.
    /// Use [`Store::submit_issue`] to reject it instead.
    pub fn create_issue(
        &self,
        title: impl Into<String>,
        description: impl Into<String>,
        assignee_id: Option<UserId>,
    ) -> Issue {
        let assignee = assignee_id.and_then(|id| {
            let user = self.get_user(id);
            if user.is_none() {
                tracing::warn!(user_id = id, "unknown assignee, creating issue unassigned");
            }
            user
        });
        self.state
            .write()
            .insert(title.into(), description.into(), assignee)
    }

    /// Apply an already-validated patch. Returns `None` if the issue does
    /// not exist.
    pub fn update_issue(&self, id: IssueId, patch: &IssuePatch) -> Option<Issue> {
        self.state.write().apply(id, patch)
    }

    /// Validate and create an issue
    pub fn submit_issue(&self, req: &NewIssue) -> Result<Issue> {
        let assignee = transition::check_create(req, &self.users)?;
        Ok(self
            .state
            .write()
            .insert(req.title.clone(), req.description.clone(), assignee))
    }

    /// Validate and apply a partial update as one step.
    ///
    /// The write lock is held from the lookup through the mutation, so a
    /// concurrent writer cannot change the issue between the check and the
    /// apply.
    pub fn submit_update(&self, id: IssueId, req: &IssueUpdate) -> Result<Issue> {
        let mut state = self.state.write();
        let current = state.issues.get(&id).ok_or(Error::NotFound(id))?;

        let patch = match transition::check_update(current, req, &self.users) {
            Ok(patch) => patch,
            Err(e) => {
                tracing::debug!(issue_id = id, error = %e, "update rejected");
                return Err(e);
            }
        };

        state.apply(id, &patch).ok_or(Error::NotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use crate::issue::Assignment;

    fn store_with(status: Status) -> (Store, IssueId) {
        let store = Store::default();
        let id = store.create_issue("fix bug", "", Some(1)).id;
        if status != Status::InProgress {
            store
                .submit_update(id, &IssueUpdate::default().status(status.as_str()))
                .unwrap();
        }
        (store, id)
    }

    #[test]
    fn test_seeded_users() {
        let store = Store::default();
        assert_eq!(store.users().len(), 3);
        assert_eq!(store.get_user(2).unwrap().name, "이디자인");
        assert!(store.get_user(0).is_none());
        assert!(store.get_user(4).is_none());
    }

    #[test]
    fn test_create_unassigned_is_pending() {
        let store = Store::default();
        let issue = store.submit_issue(&NewIssue::new("fix bug")).unwrap();
        assert_eq!(issue.status, Status::Pending);
        assert!(issue.assignee.is_none());
        assert_eq!(issue.description, "");
    }

    #[test]
    fn test_create_assigned_is_in_progress() {
        let store = Store::default();
        let issue = store
            .submit_issue(&NewIssue::new("fix bug").assignee(1))
            .unwrap();
        assert_eq!(issue.status, Status::InProgress);
        assert_eq!(issue.assignee_id(), Some(1));
    }

    #[test]
    fn test_create_unknown_assignee_falls_back() {
        let store = Store::default();
        let issue = store.create_issue("fix bug", "", Some(99));
        assert_eq!(issue.status, Status::Pending);
        assert!(issue.assignee.is_none());
    }

    #[test]
    fn test_submit_rejects_unknown_assignee() {
        let store = Store::default();
        let err = store
            .submit_issue(&NewIssue::new("fix bug").assignee(99))
            .unwrap_err();
        assert!(matches!(err, Error::UnknownUser(99)));
        assert!(store.is_empty());
    }

    #[test]
    fn test_ids_increase() {
        let store = Store::default();
        let a = store.create_issue("a", "", None);
        let b = store.create_issue("b", "", Some(2));
        store
            .submit_update(a.id, &IssueUpdate::default().assign(3))
            .unwrap();
        let c = store.create_issue("c", "", None);
        assert_eq!((a.id, b.id, c.id), (1, 2, 3));
    }

    #[test]
    fn test_snapshots_are_detached() {
        let store = Store::default();
        let mut snapshot = store.create_issue("fix bug", "", None);
        snapshot.title = "changed locally".into();
        assert_eq!(store.get_issue(snapshot.id).unwrap().title, "fix bug");
    }

    #[test]
    fn test_filter_by_status() {
        let store = Store::default();
        store.create_issue("a", "", None);
        store.create_issue("b", "", Some(1));
        store.create_issue("c", "", Some(2));

        assert_eq!(store.issues_by_status(Status::Pending).len(), 1);
        assert_eq!(store.issues_by_status(Status::InProgress).len(), 2);
        assert!(store.issues_by_status(Status::Completed).is_empty());
        assert_eq!(store.all_issues().len(), 3);
    }

    #[test]
    fn test_assign_pending_advances() {
        let store = Store::default();
        let id = store.create_issue("fix bug", "", None).id;
        let issue = store
            .submit_update(id, &IssueUpdate::default().assign(2))
            .unwrap();
        assert_eq!(issue.status, Status::InProgress);
        assert_eq!(issue.assignee_id(), Some(2));
    }

    #[test]
    fn test_unassign_resets_to_pending() {
        let (store, id) = store_with(Status::InProgress);
        let issue = store
            .submit_update(id, &IssueUpdate::default().unassign())
            .unwrap();
        assert_eq!(issue.status, Status::Pending);
        assert!(issue.assignee.is_none());
    }

    #[test]
    fn test_completed_issue_is_locked() {
        let (store, id) = store_with(Status::Completed);
        let before = store.get_issue(id).unwrap();

        let err = store
            .submit_update(id, &IssueUpdate::default().title("reopen"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IllegalTransition);
        assert_eq!(store.get_issue(id).unwrap(), before);
    }

    #[test]
    fn test_status_without_assignee_rejected() {
        let store = Store::default();
        let id = store.create_issue("fix bug", "", None).id;
        let before = store.get_issue(id).unwrap();

        let err = store
            .submit_update(id, &IssueUpdate::default().status("IN_PROGRESS"))
            .unwrap_err();
        assert!(matches!(err, Error::AssigneeRequired(Status::InProgress)));
        assert_eq!(store.get_issue(id).unwrap(), before);
    }

    #[test]
    fn test_update_unknown_issue() {
        let store = Store::default();
        let err = store
            .submit_update(7, &IssueUpdate::default().title("x"))
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(7)));
        assert!(store.update_issue(7, &IssuePatch::default()).is_none());
        assert!(!store.contains_issue(7));

        let id = store.create_issue("fix bug", "", None).id;
        assert!(store.contains_issue(id));
    }

    #[test]
    fn test_update_refreshes_timestamp() {
        let store = Store::default();
        let created = store.create_issue("fix bug", "", None);
        let updated = store
            .submit_update(created.id, &IssueUpdate::default().description("more"))
            .unwrap();
        assert!(updated.updated_at >= created.updated_at);
        assert_eq!(updated.created_at, created.created_at);
    }

    #[test]
    fn test_unchecked_update_applies_patch() {
        let store = Store::default();
        let id = store.create_issue("fix bug", "", None).id;
        let patch = IssuePatch {
            assignee: Some(Assignment::Assign(store.get_user(3).unwrap())),
            ..Default::default()
        };
        let issue = store.update_issue(id, &patch).unwrap();
        assert_eq!(issue.status, Status::InProgress);
        assert_eq!(issue.assignee_id(), Some(3));
    }

    #[test]
    fn test_concurrent_creates_get_unique_ids() {
        let store = Store::default();
        let mut ids: Vec<IssueId> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|t| {
                    let store = &store;
                    s.spawn(move || {
                        (0..50)
                            .map(|i| store.create_issue(format!("t{t}-{i}"), "", None).id)
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            handles
                .into_iter()
                .flat_map(|h| h.join().unwrap())
                .collect()
        });
        ids.sort_unstable();
        assert_eq!(ids, (1..=400).collect::<Vec<_>>());
    }

    #[test]
    fn test_concurrent_close_and_edit() {
        // One writer closes the issue while others try to rename it. Every
        // rename either lands before the close or is rejected after it.
        let (store, id) = store_with(Status::InProgress);
        std::thread::scope(|s| {
            s.spawn(|| {
                store
                    .submit_update(id, &IssueUpdate::default().status("COMPLETED"))
                    .unwrap();
            });
            for i in 0..4 {
                let store = &store;
                s.spawn(move || {
                    let _ = store.submit_update(id, &IssueUpdate::default().title(format!("r{i}")));
                });
            }
        });

        let closed = store.get_issue(id).unwrap();
        assert_eq!(closed.status, Status::Completed);
        assert!(
            store
                .submit_update(id, &IssueUpdate::default().title("late"))
                .is_err()
        );
        assert_eq!(store.get_issue(id).unwrap(), closed);
    }
}
