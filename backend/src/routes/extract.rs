//! Extractors whose rejections use the API error envelope

use crate::error::ApiError;
use axum::extract::{FromRequest, FromRequestParts, Path};
use serde::Deserialize;
use uuid::Uuid;

/// `Json<T>` with malformed bodies reported as `INVALID_REQUEST`
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);

/// A single `:id` path segment parsed as a UUID
///
/// The derive extracts `Path<IdPath>`, so the newtype itself deserializes
/// from the segment.
#[derive(Debug, Deserialize, FromRequestParts)]
#[from_request(via(Path), rejection(ApiError))]
pub struct IdPath(pub Uuid);

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        routing::get,
        Router,
    };
    use tower::ServiceExt;

    async fn echo_id(IdPath(id): IdPath) -> String {
        id.to_string()
    }

    fn app() -> Router {
        Router::new().route("/items/:id", get(echo_id))
    }

    async fn call(uri: &str) -> (StatusCode, String) {
        let response = app()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8_lossy(&bytes).into_owned())
    }

    #[tokio::test]
    async fn test_id_path_parses_uuid_segment() {
        let id = Uuid::new_v4();
        let (status, body) = call(&format!("/items/{}", id)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, id.to_string());
    }

    #[tokio::test]
    async fn test_id_path_rejects_non_uuid_with_envelope() {
        let (status, body) = call("/items/42").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["error"]["code"], "INVALID_REQUEST");
    }
}
