use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState, CommentPayload, authorize, require_auth};
use crate::services::access::{Action, Actor, ResourceKind};

pub async fn list_comments(
    State(state): State<Arc<AppState>>,
    Path((title_id, review_id)): Path<(i32, i32)>,
) -> Result<impl IntoResponse, ApiError> {
    let comments = state.reviews().list_comments(title_id, review_id).await?;
    Ok(Json(ApiResponse::success(comments)))
}

pub async fn get_comment(
    State(state): State<Arc<AppState>>,
    Path((title_id, review_id, comment_id)): Path<(i32, i32, i32)>,
) -> Result<impl IntoResponse, ApiError> {
    let comment = state
        .reviews()
        .get_comment(title_id, review_id, comment_id)
        .await?;
    Ok(Json(ApiResponse::success(comment)))
}

pub async fn create_comment(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path((title_id, review_id)): Path<(i32, i32)>,
    Json(payload): Json<CommentPayload>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&actor, Action::Create, ResourceKind::Comment, None)?;
    let user = require_auth(&actor)?;

    let created = state
        .reviews()
        .create_comment(title_id, review_id, user.user_id, &payload.text)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(created))))
}

pub async fn update_comment(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path((title_id, review_id, comment_id)): Path<(i32, i32, i32)>,
    Json(payload): Json<CommentPayload>,
) -> Result<impl IntoResponse, ApiError> {
    require_auth(&actor)?;
    let owner = state
        .reviews()
        .comment_author(title_id, review_id, comment_id)
        .await?;
    authorize(&actor, Action::Update, ResourceKind::Comment, Some(owner))?;

    let updated = state
        .reviews()
        .update_comment(title_id, review_id, comment_id, payload.text)
        .await?;
    Ok(Json(ApiResponse::success(updated)))
}

pub async fn delete_comment(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path((title_id, review_id, comment_id)): Path<(i32, i32, i32)>,
) -> Result<impl IntoResponse, ApiError> {
    require_auth(&actor)?;
    let owner = state
        .reviews()
        .comment_author(title_id, review_id, comment_id)
        .await?;
    authorize(&actor, Action::Delete, ResourceKind::Comment, Some(owner))?;

    state
        .reviews()
        .delete_comment(title_id, review_id, comment_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
