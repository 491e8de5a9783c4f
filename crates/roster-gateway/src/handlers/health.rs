use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::state::SharedState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub database: String,
    pub message: String,
}

/// `GET /health`. Degrades to 503 when the database does not answer.
pub async fn health_check(State(state): State<SharedState>) -> (StatusCode, Json<HealthResponse>) {
    if let Err(e) = state.employees.ping() {
        warn!(operation = "health_check", status = "degraded", "database ping failed: {}", e);
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthResponse {
                status: "degraded".to_string(),
                database: "unhealthy".to_string(),
                message: "Application is running but database is unavailable".to_string(),
            }),
        );
    }

    info!(operation = "health_check", status = "healthy", "health check passed");
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".to_string(),
            database: "healthy".to_string(),
            message: "Roster is running".to_string(),
        }),
    )
}
