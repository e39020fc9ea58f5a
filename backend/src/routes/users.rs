//! Account routes
//!
//! Registration, login and refresh are public; `/me` sits behind the
//! gatekeeper.

use super::extract::JsonBody;
use crate::auth::{require_auth, AuthUser};
use crate::error::ApiResult;
use crate::state::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};
use storefront_shared::{
    AuthResponse, DataResponse, LoginRequest, RefreshTokenRequest, RegisterRequest,
    UpdateProfileRequest, User,
};

pub fn user_routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/me", get(get_profile).put(update_profile))
        .route_layer(middleware::from_fn_with_state(state, require_auth));

    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refresh-token", post(refresh_token))
        .merge(protected)
}

/// POST /api/v1/users/register
async fn register(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<DataResponse<User>>)> {
    let user = state.auth.register(req).await?;
    Ok((StatusCode::CREATED, Json(DataResponse::new(user))))
}

/// POST /api/v1/users/login
async fn login(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> ApiResult<Json<DataResponse<AuthResponse>>> {
    let tokens = state.auth.login(req).await?;
    Ok(Json(DataResponse::new(tokens)))
}

/// POST /api/v1/users/refresh-token
async fn refresh_token(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<RefreshTokenRequest>,
) -> ApiResult<Json<DataResponse<AuthResponse>>> {
    let tokens = state.auth.refresh(req).await?;
    Ok(Json(DataResponse::new(tokens)))
}

/// GET /api/v1/users/me
async fn get_profile(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<DataResponse<User>>> {
    let profile = state.auth.get_profile(user.user_id).await?;
    Ok(Json(DataResponse::new(profile)))
}

/// PUT /api/v1/users/me
async fn update_profile(
    State(state): State<AppState>,
    user: AuthUser,
    JsonBody(req): JsonBody<UpdateProfileRequest>,
) -> ApiResult<Json<DataResponse<User>>> {
    let profile = state.auth.update_profile(user.user_id, req).await?;
    Ok(Json(DataResponse::new(profile)))
}
