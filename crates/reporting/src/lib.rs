//! `storewatch-reporting`
//!
//! **Responsibility:** the report computation engine.
//!
//! - `period`: weekly local business hours -> UTC business periods for a window.
//! - `interpolation`: sparse observations -> active/inactive minutes over an interval.
//! - `uptime`: per-store aggregation over the last hour/day/week.
//! - `source`: read-side ports the calculator consumes (implemented in infra).
//!
//! Nothing here performs I/O directly or mutates persisted state.

pub mod interpolation;
pub mod period;
pub mod source;
pub mod uptime;

pub use interpolation::{Activity, interpolate};
pub use period::{BusinessPeriod, local_to_utc, resolve_business_periods};
pub use source::{ObservationSource, ScheduleSource, SourceError};
pub use uptime::{
    ReportWindow, StoreFault, StoreOutcomes, StoreUptime, UptimeCalculator, window_activity,
};
