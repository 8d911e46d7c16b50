//! Health check endpoints.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::api::routes::AppState;

#[derive(Debug, Serialize)]
pub struct HealthBody {
    pub status: &'static str,
    pub database: &'static str,
}

/// GET /health — liveness only, no database round trip.
pub async fn health() -> Json<HealthBody> {
    Json(HealthBody { status: "ok", database: "unknown" })
}

/// GET /api/v1/system/health — readiness, including a database round trip.
pub async fn health_detailed(State(app_state): State<AppState>) -> (StatusCode, Json<HealthBody>) {
    match app_state.db.health_check().await {
        Ok(()) => (StatusCode::OK, Json(HealthBody { status: "ok", database: "connected" })),
        Err(_) => {
            (StatusCode::SERVICE_UNAVAILABLE, Json(HealthBody { status: "error", database: "error" }))
        }
    }
}
