//! Application error handling
//!
//! `ServiceError` is the domain taxonomy returned by services. `ApiError`
//! maps it (and gatekeeper failures) to HTTP responses with stable codes.

use crate::auth::TokenError;
use crate::repositories::RepositoryError;
use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use storefront_shared::validation::ValidationError;
use storefront_shared::{ErrorCode, ErrorDetail, ErrorResponse};
use thiserror::Error;
use tracing::error;

/// Entity kinds that can be missing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    User,
    Product,
}

/// Domain errors produced by the service layer
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("email already registered")]
    DuplicateIdentity,

    #[error("{0:?} not found")]
    NotFound(Resource),

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("invalid token")]
    InvalidToken,

    #[error("token has expired")]
    ExpiredToken,

    #[error("validation failed")]
    Validation(Vec<ValidationError>),

    #[error("storage error")]
    Storage(#[source] anyhow::Error),

    /// Failures outside the stores: hashing, signing, task joins
    #[error("internal error")]
    Internal(#[source] anyhow::Error),

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl ServiceError {
    /// Map a store failure for the given entity kind
    pub fn from_store(resource: Resource) -> impl FnOnce(RepositoryError) -> ServiceError {
        move |err| match err {
            RepositoryError::NotFound => ServiceError::NotFound(resource),
            RepositoryError::Duplicate => ServiceError::DuplicateIdentity,
            RepositoryError::Storage(err) => ServiceError::Storage(err),
        }
    }
}

impl From<TokenError> for ServiceError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => ServiceError::ExpiredToken,
            TokenError::Invalid => ServiceError::InvalidToken,
        }
    }
}

/// API error type that can be converted to HTTP responses
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Authorization header is required")]
    MissingToken,

    #[error("Authorization header must be Bearer token")]
    InvalidTokenFormat,

    #[error("Token has expired")]
    ExpiredToken,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Insufficient permissions")]
    Forbidden,

    #[error("Email already registered")]
    EmailExists,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("User not found")]
    UserNotFound,

    #[error("Product not found")]
    ProductNotFound,

    #[error("Invalid request body: {0}")]
    InvalidRequest(String),

    #[error("Invalid request parameters")]
    Validation(Vec<ValidationError>),

    #[error("Too many requests")]
    RateLimitExceeded,

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => ApiError::ExpiredToken,
            TokenError::Invalid => ApiError::InvalidToken,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::InvalidRequest(rejection.body_text())
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::DuplicateIdentity => ApiError::EmailExists,
            ServiceError::NotFound(Resource::User) => ApiError::UserNotFound,
            ServiceError::NotFound(Resource::Product) => ApiError::ProductNotFound,
            ServiceError::InvalidCredentials => ApiError::InvalidCredentials,
            ServiceError::InvalidToken => ApiError::InvalidToken,
            ServiceError::ExpiredToken => ApiError::ExpiredToken,
            ServiceError::Validation(errors) => ApiError::Validation(errors),
            ServiceError::Storage(err) | ServiceError::Internal(err) => ApiError::Internal(err),
            ServiceError::Configuration(msg) => ApiError::Internal(anyhow::anyhow!(msg)),
        }
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingToken
            | ApiError::InvalidTokenFormat
            | ApiError::ExpiredToken
            | ApiError::InvalidToken
            | ApiError::Unauthorized
            | ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::EmailExists => StatusCode::CONFLICT,
            ApiError::UserNotFound | ApiError::ProductNotFound => StatusCode::NOT_FOUND,
            ApiError::InvalidRequest(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            ApiError::MissingToken => ErrorCode::MissingToken,
            ApiError::InvalidTokenFormat => ErrorCode::InvalidTokenFormat,
            ApiError::ExpiredToken => ErrorCode::ExpiredToken,
            ApiError::InvalidToken => ErrorCode::InvalidToken,
            ApiError::Unauthorized => ErrorCode::Unauthorized,
            ApiError::Forbidden => ErrorCode::Forbidden,
            ApiError::EmailExists => ErrorCode::EmailExists,
            ApiError::InvalidCredentials => ErrorCode::InvalidCredentials,
            ApiError::UserNotFound => ErrorCode::UserNotFound,
            ApiError::ProductNotFound => ErrorCode::ProductNotFound,
            ApiError::InvalidRequest(_) => ErrorCode::InvalidRequest,
            ApiError::Validation(_) => ErrorCode::ValidationError,
            ApiError::RateLimitExceeded => ErrorCode::RateLimitExceeded,
            ApiError::Internal(_) => ErrorCode::InternalError,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        let (message, details) = match self {
            ApiError::Internal(err) => {
                error!("Internal error: {:?}", err);
                ("Internal server error".to_string(), None)
            }
            ApiError::Validation(errors) => {
                ("Invalid request parameters".to_string(), Some(errors))
            }
            other => (other.to_string(), None),
        };

        let body = Json(ErrorResponse {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        });

        (status, body).into_response()
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    async fn body_json(error: ApiError) -> (StatusCode, serde_json::Value) {
        let response = error.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[rstest]
    #[case(ApiError::MissingToken, StatusCode::UNAUTHORIZED, "MISSING_TOKEN")]
    #[case(ApiError::InvalidTokenFormat, StatusCode::UNAUTHORIZED, "INVALID_TOKEN_FORMAT")]
    #[case(ApiError::ExpiredToken, StatusCode::UNAUTHORIZED, "EXPIRED_TOKEN")]
    #[case(ApiError::InvalidToken, StatusCode::UNAUTHORIZED, "INVALID_TOKEN")]
    #[case(ApiError::Unauthorized, StatusCode::UNAUTHORIZED, "UNAUTHORIZED")]
    #[case(ApiError::Forbidden, StatusCode::FORBIDDEN, "FORBIDDEN")]
    #[case(ApiError::EmailExists, StatusCode::CONFLICT, "EMAIL_EXISTS")]
    #[case(ApiError::InvalidCredentials, StatusCode::UNAUTHORIZED, "INVALID_CREDENTIALS")]
    #[case(ApiError::UserNotFound, StatusCode::NOT_FOUND, "USER_NOT_FOUND")]
    #[case(ApiError::ProductNotFound, StatusCode::NOT_FOUND, "PRODUCT_NOT_FOUND")]
    #[case(ApiError::RateLimitExceeded, StatusCode::TOO_MANY_REQUESTS, "RATE_LIMIT_EXCEEDED")]
    #[tokio::test]
    async fn test_error_status_and_code(
        #[case] error: ApiError,
        #[case] status: StatusCode,
        #[case] code: &str,
    ) {
        let (actual_status, body) = body_json(error).await;
        assert_eq!(actual_status, status);
        assert_eq!(body["error"]["code"], code);
        assert!(body["error"]["message"].is_string());
    }

    #[tokio::test]
    async fn test_internal_error_hides_detail() {
        let (status, body) =
            body_json(ApiError::Internal(anyhow::anyhow!("connection refused on 5432"))).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["code"], "INTERNAL_ERROR");
        assert!(!body.to_string().contains("5432"));
    }

    #[tokio::test]
    async fn test_validation_error_lists_fields() {
        let errors = vec![ValidationError::new("email", "Invalid email format")];
        let (status, body) = body_json(ApiError::Validation(errors)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(body["error"]["details"][0]["field"], "email");
    }

    #[test]
    fn test_service_error_mapping_is_lossless() {
        assert!(matches!(
            ApiError::from(ServiceError::ExpiredToken),
            ApiError::ExpiredToken
        ));
        assert!(matches!(
            ApiError::from(ServiceError::InvalidToken),
            ApiError::InvalidToken
        ));
        assert!(matches!(
            ApiError::from(ServiceError::NotFound(Resource::User)),
            ApiError::UserNotFound
        ));
        assert!(matches!(
            ApiError::from(ServiceError::DuplicateIdentity),
            ApiError::EmailExists
        ));
        assert!(matches!(
            ApiError::from(TokenError::Expired),
            ApiError::ExpiredToken
        ));
    }

    #[tokio::test]
    async fn test_service_internal_error_is_opaque_500() {
        let err = ServiceError::Internal(anyhow::anyhow!("argon2 params rejected"));
        let (status, body) = body_json(ApiError::from(err)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["code"], "INTERNAL_ERROR");
        assert!(!body.to_string().contains("argon2"));
    }

    #[rstest]
    #[case(RepositoryError::NotFound, Resource::Product)]
    #[case(RepositoryError::NotFound, Resource::User)]
    fn test_store_not_found_keeps_resource(#[case] err: RepositoryError, #[case] resource: Resource) {
        let mapped = ServiceError::from_store(resource)(err);
        assert!(matches!(mapped, ServiceError::NotFound(r) if r == resource));
    }

    #[test]
    fn test_store_duplicate_and_storage() {
        assert!(matches!(
            ServiceError::from_store(Resource::User)(RepositoryError::Duplicate),
            ServiceError::DuplicateIdentity
        ));
        assert!(matches!(
            ServiceError::from_store(Resource::User)(RepositoryError::Storage(anyhow::anyhow!("io"))),
            ServiceError::Storage(_)
        ));
    }
}
