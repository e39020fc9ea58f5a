//! Product catalog routes
//!
//! Reads are public. Writes need an authenticated caller whose role is
//! exactly `admin`.

use super::extract::{IdPath, JsonBody};
use crate::auth::{require_auth, require_role};
use crate::error::ApiResult;
use crate::state::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    routing::{get, post, put},
    Json, Router,
};
use storefront_shared::{
    CreateProductRequest, DataResponse, Product, Role, UpdateProductRequest,
};

pub fn product_routes(state: AppState) -> Router<AppState> {
    // Layers run bottom-up: authenticate first, then check the role.
    let admin = Router::new()
        .route("/", post(create_product))
        .route("/:id", put(update_product).delete(delete_product))
        .route_layer(middleware::from_fn_with_state(Role::Admin, require_role))
        .route_layer(middleware::from_fn_with_state(state, require_auth));

    Router::new()
        .route("/", get(list_products))
        .route("/:id", get(get_product))
        .merge(admin)
}

async fn list_products(State(state): State<AppState>) -> ApiResult<Json<DataResponse<Vec<Product>>>> {
    let products = state.products.list().await?;
    Ok(Json(DataResponse::new(products)))
}

async fn get_product(
    State(state): State<AppState>,
    IdPath(id): IdPath,
) -> ApiResult<Json<DataResponse<Product>>> {
    let product = state.products.get(id).await?;
    Ok(Json(DataResponse::new(product)))
}

async fn create_product(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<CreateProductRequest>,
) -> ApiResult<(StatusCode, Json<DataResponse<Product>>)> {
    let product = state.products.create(req).await?;
    Ok((StatusCode::CREATED, Json(DataResponse::new(product))))
}

async fn update_product(
    State(state): State<AppState>,
    IdPath(id): IdPath,
    JsonBody(req): JsonBody<UpdateProductRequest>,
) -> ApiResult<Json<DataResponse<Product>>> {
    let product = state.products.update(id, req).await?;
    Ok(Json(DataResponse::new(product)))
}

async fn delete_product(State(state): State<AppState>, IdPath(id): IdPath) -> ApiResult<StatusCode> {
    state.products.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
