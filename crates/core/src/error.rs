//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Malformed domain input. Carries a human-readable description.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// An identifier could not be parsed.
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A status reading other than `active`/`inactive`.
    #[error("invalid store status: {0}")]
    InvalidStatus(String),

    /// Business-hour rules that cannot form a weekly schedule.
    #[error("invalid schedule: {0}")]
    InvalidSchedule(String),
}

impl DomainError {
    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn invalid_status(msg: impl Into<String>) -> Self {
        Self::InvalidStatus(msg.into())
    }

    pub fn invalid_schedule(msg: impl Into<String>) -> Self {
        Self::InvalidSchedule(msg.into())
    }
}
