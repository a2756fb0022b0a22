//! Health check endpoint for monitoring and readiness probes

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::api::routes::ApiState;
use crate::storage::check_connection;

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// "ok" when every dependency answers, "degraded" otherwise
    pub status: String,
    /// "ok" or "unavailable"
    pub database: String,
}

/// Health check endpoint
///
/// Unauthenticated. Answers 200 when the database responds and 503 when it does not,
/// so it can back readiness probes directly.
pub async fn health_handler(State(state): State<ApiState>) -> (StatusCode, Json<HealthResponse>) {
    match check_connection(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthResponse { status: "ok".to_string(), database: "ok".to_string() }),
        ),
        Err(e) => {
            warn!(error = %e, "health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "degraded".to_string(),
                    database: "unavailable".to_string(),
                }),
            )
        }
    }
}
