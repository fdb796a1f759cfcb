use axum::{
    Json,
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState, SignupRequest, TokenRequest, TokenResponse};
use crate::services::access::{Actor, AuthenticatedActor};

/// POST /api/v1/auth/signup
///
/// Idempotent for an existing (username, email) pairing: the code is rotated
/// and resent instead of failing.
pub async fn signup(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .accounts()
        .signup(&payload.username, &payload.email)
        .await?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "username": payload.username,
        "email": payload.email,
    }))))
}

/// POST /api/v1/auth/token
pub async fn token(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<TokenRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let token = state
        .accounts()
        .issue_token(&payload.username, &payload.confirmation_code)
        .await?;

    Ok(Json(ApiResponse::success(TokenResponse { token })))
}

/// Resolves the requester into an [`Actor`] and stores it in the request
/// extensions. Requests without an Authorization header proceed as anonymous;
/// a presented token that fails validation is rejected outright.
pub async fn resolve_actor(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header_value = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string);

    let actor = match header_value {
        None => Actor::Anonymous,
        Some(value) => {
            let token = value
                .strip_prefix("Bearer ")
                .ok_or_else(|| ApiError::unauthenticated("Malformed Authorization header"))?;

            let claims = state
                .shared
                .tokens
                .verify(token)
                .map_err(|_| ApiError::unauthenticated("Invalid or expired token"))?;

            // The subject must still exist; tokens outlive account deletion.
            let user = state
                .store()
                .users()
                .get_by_id(claims.sub)
                .await
                .map_err(|e| ApiError::DatabaseError(e.to_string()))?
                .ok_or_else(|| ApiError::unauthenticated("Token subject no longer exists"))?;

            Actor::Authenticated(AuthenticatedActor::from(&user))
        }
    };

    request.extensions_mut().insert(actor);
    Ok(next.run(request).await)
}
