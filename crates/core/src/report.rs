//! Per-store report rows.

use serde::{Deserialize, Serialize};

use crate::id::StoreId;

/// Column order of a persisted report row and of the rendered artifact.
pub const REPORT_COLUMNS: [&str; 7] = [
    "store_id",
    "uptime_last_hour",
    "uptime_last_day",
    "uptime_last_week",
    "downtime_last_hour",
    "downtime_last_day",
    "downtime_last_week",
];

/// Uptime/downtime of one store for one report.
///
/// Units: `*_last_hour` are minutes, `*_last_day` and `*_last_week` are hours.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    pub store_id: StoreId,
    pub uptime_last_hour: f64,
    pub uptime_last_day: f64,
    pub uptime_last_week: f64,
    pub downtime_last_hour: f64,
    pub downtime_last_day: f64,
    pub downtime_last_week: f64,
}

impl ReportRow {
    /// Numeric columns in `REPORT_COLUMNS` order (store id excluded).
    pub fn values(&self) -> [f64; 6] {
        [
            self.uptime_last_hour,
            self.uptime_last_day,
            self.uptime_last_week,
            self.downtime_last_hour,
            self.downtime_last_day,
            self.downtime_last_week,
        ]
    }
}
