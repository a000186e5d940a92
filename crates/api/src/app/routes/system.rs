use std::sync::Arc;

use axum::{Json, extract::Extension};

use crate::app::dto::HealthResponse;
use crate::app::services::AppServices;

pub async fn health(Extension(services): Extension<Arc<AppServices>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        executor: services.executor_stats(),
    })
}
