use axum::{Json, extract::State, response::IntoResponse};
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState};

/// GET /api/v1/system/health
pub async fn health(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    state
        .store()
        .ping()
        .await
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "status": "ok",
        "uptime_seconds": state.start_time.elapsed().as_secs(),
    }))))
}
