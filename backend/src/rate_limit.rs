//! Global request rate limiting
//!
//! One token bucket is shared by every client. It holds up to
//! `requests_per_minute` tokens and refills continuously at that rate, so a
//! burst of a full minute's allowance is accepted and then requests are
//! admitted at the steady rate. A limit of zero disables the check.

use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::{Mutex, PoisonError};
use std::time::Instant;
use tracing::warn;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed,
    Limited,
}

pub trait RateLimiter: Send + Sync {
    fn check(&self) -> RateLimitDecision;
}

/// Limiter used when rate limiting is switched off
#[derive(Clone, Debug)]
pub struct NoopRateLimiter;

impl RateLimiter for NoopRateLimiter {
    fn check(&self) -> RateLimitDecision {
        RateLimitDecision::Allowed
    }
}

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    refilled_at: Instant,
}

/// Token bucket shared across all requests
#[derive(Debug)]
pub struct TokenBucketLimiter {
    capacity: f64,
    per_second: f64,
    bucket: Mutex<Bucket>,
}

impl TokenBucketLimiter {
    /// Bucket that starts full
    pub fn per_minute(requests_per_minute: u32) -> Self {
        let capacity = f64::from(requests_per_minute);
        Self {
            capacity,
            per_second: capacity / 60.0,
            bucket: Mutex::new(Bucket {
                tokens: capacity,
                refilled_at: Instant::now(),
            }),
        }
    }

    /// Take one token as of `now`
    pub fn check_at(&self, now: Instant) -> RateLimitDecision {
        // The bucket holds plain numbers, so a poisoned lock is still consistent
        let mut bucket = self.bucket.lock().unwrap_or_else(PoisonError::into_inner);

        let elapsed = now.saturating_duration_since(bucket.refilled_at).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.per_second).min(self.capacity);
        bucket.refilled_at = bucket.refilled_at.max(now);

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            RateLimitDecision::Allowed
        } else {
            RateLimitDecision::Limited
        }
    }
}

impl RateLimiter for TokenBucketLimiter {
    fn check(&self) -> RateLimitDecision {
        self.check_at(Instant::now())
    }
}

/// Reject the request with 429 once the shared bucket is empty
pub async fn enforce_rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if state.rate_limiter.check() == RateLimitDecision::Limited {
        warn!(
            method = %request.method(),
            path = %request.uri().path(),
            "Rate limit exceeded"
        );
        return Err(ApiError::RateLimitExceeded);
    }

    Ok(next.run(request).await)
}
