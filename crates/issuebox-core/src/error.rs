//! Error types for issuebox

use crate::issue::{IssueId, Status, UserId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    #[error("Issue not found: {0}")]
    NotFound(IssueId),

    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    #[error("Nonexistent user: {0}")]
    UnknownUser(UserId),

    #[error("Issue {id} is {status} and can no longer be modified")]
    Terminal { id: IssueId, status: Status },

    #[error("Cannot hold status {0} without an assignee")]
    AssigneeRequired(Status),

    #[error("Invalid config: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Stable classification of an [`Error`], independent of its message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    MalformedRequest,
    NotFound,
    InvalidEnumValue,
    UnknownReference,
    IllegalTransition,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::MalformedRequest => "malformed_request",
            ErrorKind::NotFound => "not_found",
            ErrorKind::InvalidEnumValue => "invalid_enum_value",
            ErrorKind::UnknownReference => "unknown_reference",
            ErrorKind::IllegalTransition => "illegal_transition",
            ErrorKind::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::MalformedRequest(_) => ErrorKind::MalformedRequest,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::InvalidStatus(_) => ErrorKind::InvalidEnumValue,
            Error::UnknownUser(_) => ErrorKind::UnknownReference,
            Error::Terminal { .. } | Error::AssigneeRequired(_) => ErrorKind::IllegalTransition,
            Error::Config(_) | Error::Io(_) => ErrorKind::Internal,
        }
    }
}
