//! `storewatch-core`: domain primitives for store uptime reporting.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod error;
pub mod id;
pub mod observation;
pub mod report;
pub mod schedule;

pub use error::{DomainError, DomainResult};
pub use id::{ReportId, StoreId};
pub use observation::{Observation, StoreStatus};
pub use report::{REPORT_COLUMNS, ReportRow};
pub use schedule::{BusinessHourRule, DailyHours, WeeklySchedule};
