use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState, SlugPayload, authorize};
use crate::services::access::{Action, Actor, ResourceKind};

pub async fn list_genres(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let genres = state.catalog().list_genres().await?;
    Ok(Json(ApiResponse::success(genres)))
}

pub async fn create_genre(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Json(payload): Json<SlugPayload>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&actor, Action::Create, ResourceKind::Genre, None)?;

    let created = state
        .catalog()
        .create_genre(&payload.name, &payload.slug)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(created))))
}

pub async fn delete_genre(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&actor, Action::Delete, ResourceKind::Genre, None)?;

    state.catalog().delete_genre(&slug).await?;
    Ok(StatusCode::NO_CONTENT)
}
