//! Stable error codes surfaced in API error bodies
//!
//! Clients match on these strings, so the text of each code must never change.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Error code carried in `{"error": {"code": ...}}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    MissingToken,
    InvalidTokenFormat,
    ExpiredToken,
    InvalidToken,
    Unauthorized,
    Forbidden,
    EmailExists,
    InvalidCredentials,
    UserNotFound,
    ProductNotFound,
    InvalidRequest,
    ValidationError,
    RateLimitExceeded,
    InternalError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::MissingToken => "MISSING_TOKEN",
            ErrorCode::InvalidTokenFormat => "INVALID_TOKEN_FORMAT",
            ErrorCode::ExpiredToken => "EXPIRED_TOKEN",
            ErrorCode::InvalidToken => "INVALID_TOKEN",
            ErrorCode::Unauthorized => "UNAUTHORIZED",
            ErrorCode::Forbidden => "FORBIDDEN",
            ErrorCode::EmailExists => "EMAIL_EXISTS",
            ErrorCode::InvalidCredentials => "INVALID_CREDENTIALS",
            ErrorCode::UserNotFound => "USER_NOT_FOUND",
            ErrorCode::ProductNotFound => "PRODUCT_NOT_FOUND",
            ErrorCode::InvalidRequest => "INVALID_REQUEST",
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
