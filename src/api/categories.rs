use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState, SlugPayload, authorize};
use crate::services::access::{Action, Actor, ResourceKind};

pub async fn list_categories(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let categories = state.catalog().list_categories().await?;
    Ok(Json(ApiResponse::success(categories)))
}

pub async fn create_category(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Json(payload): Json<SlugPayload>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&actor, Action::Create, ResourceKind::Category, None)?;

    let created = state
        .catalog()
        .create_category(&payload.name, &payload.slug)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(created))))
}

pub async fn delete_category(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&actor, Action::Delete, ResourceKind::Category, None)?;

    state.catalog().delete_category(&slug).await?;
    Ok(StatusCode::NO_CONTENT)
}
