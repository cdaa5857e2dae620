//! issuebox-core: Core library for the issuebox issue tracker
//!
//! Provides the data model, the in-memory store and the rules that decide
//! how an issue's status and assignee may change together.

pub mod config;
pub mod error;
pub mod issue;
pub mod request;
pub mod store;
pub mod transition;

pub use config::Config;
pub use error::{Error, ErrorKind};
pub use issue::{Assignment, Issue, IssueId, IssuePatch, Status, User, UserId};
pub use request::{IssueUpdate, NewIssue};
pub use store::Store;
pub use transition::{UserDirectory, check_create, check_update};

/// Result type for issuebox operations
pub type Result<T> = std::result::Result<T, Error>;
