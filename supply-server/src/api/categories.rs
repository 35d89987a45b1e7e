//! Category routes
//!
//! Reads are public; mutations require the `Admin` role.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use shared::error::AppResult;
use shared::models::{Category, CategoryCreate, CategoryUpdate, SuccessResponse};

use crate::auth::RequireAdmin;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/categories", get(list).post(create))
        .route(
            "/api/categories/{id}",
            get(get_by_id).put(update).delete(delete),
        )
}

async fn list(State(state): State<AppState>) -> AppResult<Json<Vec<Category>>> {
    Ok(Json(state.catalog.list_categories().await?))
}

async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Category>> {
    Ok(Json(state.catalog.get_category(id).await?))
}

async fn create(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Json(payload): Json<CategoryCreate>,
) -> AppResult<Json<Category>> {
    Ok(Json(state.catalog.create_category(payload).await?))
}

async fn update(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<i64>,
    Json(payload): Json<CategoryUpdate>,
) -> AppResult<Json<Category>> {
    Ok(Json(state.catalog.update_category(id, payload).await?))
}

/// Fails with 409 while products still use the category
async fn delete(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<i64>,
) -> AppResult<Json<SuccessResponse>> {
    state.catalog.delete_category(id).await?;
    Ok(Json(SuccessResponse { success: true }))
}
