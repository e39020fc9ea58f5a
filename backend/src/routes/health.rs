//! Health check endpoints
//!
//! Provides Kubernetes-compatible health check endpoints:
//! - /health - Basic health check
//! - /health/ready - Readiness probe (checks the active store)
//! - /health/live - Liveness probe (always returns OK if server is running)

use crate::{db, state::AppState};
use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checks: Option<HealthChecks>,
}

#[derive(Serialize)]
pub struct HealthChecks {
    pub storage: CheckStatus,
}

/// Status of an individual check
#[derive(Serialize)]
pub struct CheckStatus {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl CheckStatus {
    fn healthy(message: Option<String>) -> Self {
        Self {
            status: "healthy".to_string(),
            message,
        }
    }

    fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

fn response(status: &str, checks: Option<HealthChecks>) -> HealthResponse {
    HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks,
    }
}

/// Basic health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    Json(response("healthy", None))
}

/// Readiness probe; 503 when the database is unreachable
pub async fn readiness_check(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, (StatusCode, Json<HealthResponse>)> {
    let storage = match state.db() {
        None => CheckStatus::healthy(Some("in-memory".to_string())),
        Some(pool) => match db::health_check(pool).await {
            Ok(()) => CheckStatus::healthy(None),
            // Detail stays in the logs
            Err(_) => CheckStatus {
                status: "unhealthy".to_string(),
                message: Some("database unreachable".to_string()),
            },
        },
    };

    if storage.is_healthy() {
        Ok(Json(response("ready", Some(HealthChecks { storage }))))
    } else {
        Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(response("not_ready", Some(HealthChecks { storage }))),
        ))
    }
}

/// Liveness probe; always OK while the process is serving
pub async fn liveness_check() -> Json<HealthResponse> {
    Json(response("alive", None))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    #[tokio::test]
    async fn test_health_check_returns_healthy() {
        let response = health_check().await;
        assert_eq!(response.status, "healthy");
        assert!(!response.version.is_empty());
    }

    #[tokio::test]
    async fn test_liveness_check_returns_alive() {
        let response = liveness_check().await;
        assert_eq!(response.status, "alive");
    }

    #[tokio::test]
    async fn test_in_memory_store_is_always_ready() {
        let state = AppState::in_memory(AppConfig::default());
        let Ok(Json(response)) = readiness_check(State(state)).await else {
            panic!("in-memory store should be ready");
        };
        assert_eq!(response.status, "ready");
    }
}
