//! Report job types and the job lifecycle state machine.

use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use storewatch_core::ReportId;

/// Lifecycle status of a report job.
///
/// `Created -> Running -> {Completed, Failed}`. Statuses only ever move forward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum ReportStatus {
    /// Recorded and handed to the executor, computation not started yet
    Created,
    /// Computation in progress
    Running,
    /// Every store attempted and all produced rows persisted
    Completed,
    /// Job-level fault; no rows are visible
    Failed { error: String },
}

/// Something that happened to a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobEvent {
    Start,
    Complete,
    Fail(String),
}

impl JobEvent {
    fn name(&self) -> &'static str {
        match self {
            JobEvent::Start => "start",
            JobEvent::Complete => "complete",
            JobEvent::Fail(_) => "fail",
        }
    }
}

/// Rejected status transition.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("cannot {event} a report that is {from}")]
pub struct TransitionError {
    pub from: &'static str,
    pub event: &'static str,
}

impl ReportStatus {
    /// Transition function, total over every `(status, event)` pair.
    pub fn apply(&self, event: JobEvent) -> Result<ReportStatus, TransitionError> {
        use JobEvent as E;
        use ReportStatus as S;

        match (self, event) {
            (S::Created, E::Start) => Ok(S::Running),
            (S::Created, E::Fail(error)) => Ok(S::Failed { error }),
            (S::Running, E::Complete) => Ok(S::Completed),
            (S::Running, E::Fail(error)) => Ok(S::Failed { error }),
            (S::Created, event @ E::Complete)
            | (S::Running, event @ E::Start)
            | (S::Completed, event)
            | (S::Failed { .. }, event) => Err(TransitionError {
                from: self.as_str(),
                event: event.name(),
            }),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ReportStatus::Completed | ReportStatus::Failed { .. })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Created => "created",
            ReportStatus::Running => "running",
            ReportStatus::Completed => "completed",
            ReportStatus::Failed { .. } => "failed",
        }
    }

    /// Rebuild a status from its stored name and optional error column.
    pub fn from_parts(name: &str, error: Option<String>) -> Result<Self, UnknownStatus> {
        let name = name.parse::<StatusName>()?;
        Ok(match name {
            StatusName::Created => ReportStatus::Created,
            StatusName::Running => ReportStatus::Running,
            StatusName::Completed => ReportStatus::Completed,
            StatusName::Failed => ReportStatus::Failed {
                error: error.unwrap_or_default(),
            },
        })
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            ReportStatus::Failed { error } => Some(error),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown report status '{0}'")]
pub struct UnknownStatus(pub String);

enum StatusName {
    Created,
    Running,
    Completed,
    Failed,
}

impl FromStr for StatusName {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "created" => Ok(StatusName::Created),
            "running" => Ok(StatusName::Running),
            "completed" => Ok(StatusName::Completed),
            "failed" => Ok(StatusName::Failed),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// A report job record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportJob {
    pub id: ReportId,
    pub status: ReportStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl ReportJob {
    /// Create a new job record in `Created` state.
    pub fn new(created_at: DateTime<Utc>) -> Self {
        Self {
            id: ReportId::new(),
            status: ReportStatus::Created,
            created_at,
            completed_at: None,
        }
    }

    /// Apply `event`, stamping `completed_at` on entering a terminal status.
    pub fn transition(&mut self, event: JobEvent, at: DateTime<Utc>) -> Result<(), TransitionError> {
        let next = self.status.apply(event)?;
        if next.is_terminal() {
            self.completed_at = Some(at);
        }
        self.status = next;
        Ok(())
    }
}

/// Externally visible outcome of a status check.
///
/// `Created` and `Running` both read back as `Running`; an id with no job record is
/// `NotFound` rather than being mistaken for a report still in progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum ReportState {
    Running,
    Completed,
    Failed { error: String },
    NotFound,
}

impl From<&ReportStatus> for ReportState {
    fn from(status: &ReportStatus) -> Self {
        match status {
            ReportStatus::Created | ReportStatus::Running => ReportState::Running,
            ReportStatus::Completed => ReportState::Completed,
            ReportStatus::Failed { error } => ReportState::Failed { error: error.clone() },
        }
    }
}
