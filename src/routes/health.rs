use axum::routing::get;
use axum::{Json, Router};
use std::sync::Arc;

use crate::app::AppState;
use crate::models::api::HealthResponse;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(health))
}

/// GET /health - Liveness check; never touches external services.
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
