use axum::Router;

pub mod reports;
pub mod system;

/// Router for the report endpoints.
pub fn router() -> Router {
    reports::router()
}
