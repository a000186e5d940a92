use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use storewatch_infra::jobs::{ControllerError, ReportStoreError, TriggerError};

pub fn trigger_error_to_response(err: TriggerError) -> axum::response::Response {
    match err {
        TriggerError::Store(e) => store_error_to_response(e),
        TriggerError::ExecutorStopped => json_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "executor_stopped",
            err.to_string(),
        ),
    }
}

pub fn controller_error_to_response(err: ControllerError) -> axum::response::Response {
    match err {
        ControllerError::Store(e) => store_error_to_response(e),
        ControllerError::Artifact(e) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "artifact_error", e.to_string())
        }
    }
}

pub fn store_error_to_response(err: ReportStoreError) -> axum::response::Response {
    match err {
        ReportStoreError::NotFound(_) => json_error(StatusCode::NOT_FOUND, "not_found", err.to_string()),
        ReportStoreError::AlreadyExists(_) => json_error(StatusCode::CONFLICT, "conflict", err.to_string()),
        ReportStoreError::InvalidTransition(_) => {
            json_error(StatusCode::CONFLICT, "invalid_transition", err.to_string())
        }
        ReportStoreError::Storage(msg) => json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", msg),
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
