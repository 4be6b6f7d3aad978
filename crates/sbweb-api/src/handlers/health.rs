use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::error::ApiError;
use crate::response::ApiResponse;
use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    version: String,
}

#[derive(Serialize)]
pub struct ReadinessResponse {
    session_backend: bool,
}

pub async fn health_check() -> (StatusCode, Json<HealthResponse>) {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}

/// Ready when the session backend answers, reconnecting once if needed.
pub async fn readiness_check(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<ReadinessResponse>>, ApiError> {
    if !state.sessions.is_connected().await {
        state
            .sessions
            .try_reconnect()
            .await
            .map_err(|e| ApiError::ServiceUnavailable(e.to_string()))?;
    }

    Ok(Json(ApiResponse::ok(ReadinessResponse {
        session_backend: true,
    })))
}
