use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState, authorize, require_auth};
use crate::services::access::{Action, Actor, ResourceKind};
use crate::services::{NewUser, ProfileUpdate};

pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&actor, Action::Read, ResourceKind::UserAccount, None)?;

    let users = state.accounts().list_users().await?;
    Ok(Json(ApiResponse::success(users)))
}

pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Json(payload): Json<NewUser>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&actor, Action::Create, ResourceKind::UserAccount, None)?;
    let is_admin = require_auth(&actor)?.is_admin();

    let created = state.accounts().create_user(payload, is_admin).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(created))))
}

pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&actor, Action::Read, ResourceKind::UserAccount, None)?;

    let user = state.accounts().get_user(&username).await?;
    Ok(Json(ApiResponse::success(user)))
}

pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(username): Path<String>,
    Json(patch): Json<ProfileUpdate>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&actor, Action::Update, ResourceKind::UserAccount, None)?;
    let is_admin = require_auth(&actor)?.is_admin();

    let updated = state.accounts().update_user(&username, patch, is_admin).await?;
    Ok(Json(ApiResponse::success(updated)))
}

pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&actor, Action::Delete, ResourceKind::UserAccount, None)?;

    state.accounts().delete_user(&username).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&actor, Action::Read, ResourceKind::OwnProfile, None)?;
    let user = require_auth(&actor)?;

    let profile = state.accounts().get_profile(user.user_id).await?;
    Ok(Json(ApiResponse::success(profile)))
}

/// PATCH /users/me. The service discards any role change, so a user cannot
/// promote themselves.
pub async fn update_me(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Json(patch): Json<ProfileUpdate>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&actor, Action::Update, ResourceKind::OwnProfile, None)?;
    let user = require_auth(&actor)?;

    let profile = state.accounts().update_own_profile(user.user_id, patch).await?;
    Ok(Json(ApiResponse::success(profile)))
}
