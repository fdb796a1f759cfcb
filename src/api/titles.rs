use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState, authorize};
use crate::services::access::{Action, Actor, ResourceKind};
use crate::services::{NewTitle, TitlePatch};

pub async fn list_titles(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let titles = state.catalog().list_titles().await?;
    Ok(Json(ApiResponse::success(titles)))
}

pub async fn get_title(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    let title = state.catalog().get_title(id).await?;
    Ok(Json(ApiResponse::success(title)))
}

pub async fn create_title(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Json(payload): Json<NewTitle>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&actor, Action::Create, ResourceKind::Title, None)?;

    let created = state.catalog().create_title(payload).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(created))))
}

pub async fn update_title(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i32>,
    Json(patch): Json<TitlePatch>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&actor, Action::Update, ResourceKind::Title, None)?;

    let updated = state.catalog().update_title(id, patch).await?;
    Ok(Json(ApiResponse::success(updated)))
}

pub async fn delete_title(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&actor, Action::Delete, ResourceKind::Title, None)?;

    state.catalog().delete_title(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
