use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState, ReviewPatchPayload, ReviewPayload, authorize, require_auth};
use crate::services::access::{Action, Actor, ResourceKind};

pub async fn list_reviews(
    State(state): State<Arc<AppState>>,
    Path(title_id): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    let reviews = state.reviews().list_reviews(title_id).await?;
    Ok(Json(ApiResponse::success(reviews)))
}

pub async fn get_review(
    State(state): State<Arc<AppState>>,
    Path((title_id, review_id)): Path<(i32, i32)>,
) -> Result<impl IntoResponse, ApiError> {
    let review = state.reviews().get_review(title_id, review_id).await?;
    Ok(Json(ApiResponse::success(review)))
}

pub async fn create_review(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(title_id): Path<i32>,
    Json(payload): Json<ReviewPayload>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&actor, Action::Create, ResourceKind::Review, None)?;
    let user = require_auth(&actor)?;

    let created = state
        .reviews()
        .create_review(title_id, user.user_id, &payload.text, payload.score)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(created))))
}

pub async fn update_review(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path((title_id, review_id)): Path<(i32, i32)>,
    Json(payload): Json<ReviewPatchPayload>,
) -> Result<impl IntoResponse, ApiError> {
    require_auth(&actor)?;
    // Missing reviews report 404 before the ownership check runs.
    let owner = state.reviews().review_author(title_id, review_id).await?;
    authorize(&actor, Action::Update, ResourceKind::Review, Some(owner))?;

    let updated = state
        .reviews()
        .update_review(title_id, review_id, payload.text, payload.score)
        .await?;
    Ok(Json(ApiResponse::success(updated)))
}

pub async fn delete_review(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path((title_id, review_id)): Path<(i32, i32)>,
) -> Result<impl IntoResponse, ApiError> {
    require_auth(&actor)?;
    let owner = state.reviews().review_author(title_id, review_id).await?;
    authorize(&actor, Action::Delete, ResourceKind::Review, Some(owner))?;

    state.reviews().delete_review(title_id, review_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
