use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::{HeaderName, StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};

use storewatch_core::ReportId;
use storewatch_infra::jobs::ArtifactOutcome;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

const REPORT_STATUS: HeaderName = HeaderName::from_static("report-status");

pub fn router() -> Router {
    Router::new()
        .route("/trigger_report", post(trigger_report))
        .route("/get_report/:report_id", get(get_report))
}

pub async fn trigger_report(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.trigger().await {
        Ok(id) => (StatusCode::OK, Json(dto::TriggerReportResponse::from(id))).into_response(),
        Err(e) => errors::trigger_error_to_response(e),
    }
}

pub async fn get_report(
    Extension(services): Extension<Arc<AppServices>>,
    Path(report_id): Path<String>,
) -> axum::response::Response {
    let Ok(id) = report_id.parse::<ReportId>() else {
        return errors::json_error(StatusCode::NOT_FOUND, "not_found", format!("report {report_id} not found"));
    };

    let outcome = match services.controller().get_artifact(id).await {
        Ok(outcome) => outcome,
        Err(e) => return errors::controller_error_to_response(e),
    };

    match outcome {
        ArtifactOutcome::Ready(artifact) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "text/csv".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", artifact.file_name()),
                ),
                (REPORT_STATUS, "Completed".to_string()),
            ],
            artifact.contents,
        )
            .into_response(),
        ArtifactOutcome::NotReady => (StatusCode::OK, Json(dto::ReportStatusResponse::running())).into_response(),
        ArtifactOutcome::Failed { error } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(dto::ReportStatusResponse::failed(error)),
        )
            .into_response(),
        ArtifactOutcome::NotFound => {
            errors::json_error(StatusCode::NOT_FOUND, "not_found", format!("report {id} not found"))
        }
    }
}
