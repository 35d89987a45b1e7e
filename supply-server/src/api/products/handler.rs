//! Product API handlers

use axum::{
    Json,
    extract::{Path, State},
};
use shared::error::AppResult;
use shared::models::{Product, ProductCreate, ProductUpdate, StockUpdate, SuccessResponse};

use crate::auth::RequireAdmin;
use crate::state::AppState;

/// GET /api/products
pub async fn list(State(state): State<AppState>) -> AppResult<Json<Vec<Product>>> {
    Ok(Json(state.catalog.list_products().await?))
}

/// GET /api/products/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Product>> {
    Ok(Json(state.catalog.get_product(id).await?))
}

/// POST /api/products
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Json(payload): Json<ProductCreate>,
) -> AppResult<Json<Product>> {
    Ok(Json(state.catalog.create_product(payload).await?))
}

/// PUT /api/products/{id}
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<i64>,
    Json(payload): Json<ProductUpdate>,
) -> AppResult<Json<Product>> {
    Ok(Json(state.catalog.update_product(id, payload).await?))
}

/// DELETE /api/products/{id} - soft delete
pub async fn delete(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<i64>,
) -> AppResult<Json<SuccessResponse>> {
    state.catalog.delete_product(id).await?;
    Ok(Json(SuccessResponse { success: true }))
}

/// PUT /api/products/{id}/stock
pub async fn set_stock(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<i64>,
    Json(payload): Json<StockUpdate>,
) -> AppResult<Json<Product>> {
    Ok(Json(state.catalog.set_stock(id, payload.new_stock).await?))
}
