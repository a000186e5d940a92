//! Report jobs: lifecycle state machine, persistence and background execution.
//!
//! ## Components
//!
//! - `ReportStatus` / `JobEvent`: the job state machine (`Created -> Running -> {Completed, Failed}`)
//! - `ReportStore`: persistence for jobs and their rows (in-memory or Postgres)
//! - `ReportController`: creates, runs and answers status/artifact queries for jobs
//! - `ReportExecutor`: runs queued jobs on background tasks

pub mod executor;
pub mod postgres;
pub mod store;
pub mod types;

pub use executor::{
    ArtifactOutcome, ControllerError, ExecutorStats, JobFault, ReportController, ReportExecutor,
    ReportExecutorConfig, ReportExecutorHandle, TriggerError,
};
pub use postgres::PostgresReportStore;
pub use store::{InMemoryReportStore, ReportStore, ReportStoreError};
pub use types::{JobEvent, ReportJob, ReportState, ReportStatus, TransitionError, UnknownStatus};
