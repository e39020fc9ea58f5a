//! Authentication middleware
//!
//! `require_auth` turns a bearer token into an [`AuthUser`] stored in the
//! request extensions; `require_role` runs after it and compares the attached
//! role by equality. Routes that are public simply do not get these layers.

use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    extract::{FromRef, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use storefront_shared::Role;
use tracing::debug;
use uuid::Uuid;

use super::TokenService;

/// Authenticated identity attached to a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
}

/// Pull the token out of `Authorization: Bearer <token>`
///
/// The header must split on single spaces into exactly two parts.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    let value = match headers.get(AUTHORIZATION) {
        None => return Err(ApiError::MissingToken),
        Some(value) if value.is_empty() => return Err(ApiError::MissingToken),
        Some(value) => value.to_str().map_err(|_| ApiError::InvalidTokenFormat)?,
    };

    let mut parts = value.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("Bearer"), Some(token), None) => Ok(token),
        _ => Err(ApiError::InvalidTokenFormat),
    }
}

/// Validate the request's bearer token and build the authenticated identity
pub fn authenticate(tokens: &TokenService, headers: &HeaderMap) -> Result<AuthUser, ApiError> {
    let token = bearer_token(headers)?;

    let claims = tokens.validate_access_token(token).map_err(|e| {
        debug!(error = %e, "Rejected access token");
        ApiError::from(e)
    })?;

    Ok(AuthUser {
        user_id: claims.sub,
        email: claims.email,
        role: claims.role,
    })
}

/// Equality-only role check
pub fn ensure_role(user: &AuthUser, required: Role) -> Result<(), ApiError> {
    if user.role != required {
        debug!(user_id = %user.user_id, role = %user.role, required = %required, "Role check failed");
        return Err(ApiError::Forbidden);
    }
    Ok(())
}

/// Handlers can take `AuthUser` directly.
///
/// Behind `require_auth` the identity is already in the extensions; otherwise
/// the header is validated here with the same rules.
#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(user.clone());
        }

        let app_state = AppState::from_ref(state);
        authenticate(app_state.jwt(), &parts.headers)
    }
}

/// Reject unauthenticated requests; attach `AuthUser` otherwise
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = authenticate(state.jwt(), request.headers())?;
    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

/// Reject requests whose authenticated role is not exactly `required`
///
/// Mount with `middleware::from_fn_with_state(Role::Admin, require_role)`
/// inside a `require_auth` layer.
pub async fn require_role(
    State(required): State<Role>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = request
        .extensions()
        .get::<AuthUser>()
        .ok_or(ApiError::Unauthorized)?;
    ensure_role(user, required)?;

    Ok(next.run(request).await)
}
