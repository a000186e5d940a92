use serde::Serialize;

use storewatch_core::ReportId;
use storewatch_infra::jobs::ExecutorStats;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub executor: ExecutorStats,
}

#[derive(Debug, Serialize)]
pub struct TriggerReportResponse {
    pub report_id: String,
}

impl From<ReportId> for TriggerReportResponse {
    fn from(id: ReportId) -> Self {
        Self {
            report_id: id.to_string(),
        }
    }
}

/// Body returned while a report is not downloadable.
#[derive(Debug, Serialize)]
pub struct ReportStatusResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ReportStatusResponse {
    pub fn running() -> Self {
        Self {
            status: "Running",
            error: None,
        }
    }

    pub fn failed(error: String) -> Self {
        Self {
            status: "Failed",
            error: Some(error),
        }
    }
}
