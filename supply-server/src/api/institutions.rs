//! Institution routes
//!
//! Listing and reading are public; mutations and the member list require
//! the `Admin` role.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use shared::error::AppResult;
use shared::models::{Institution, InstitutionCreate, InstitutionUpdate, SuccessResponse, UserDto};

use crate::auth::RequireAdmin;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/institutions", get(list).post(create))
        .route(
            "/api/institutions/{id}",
            get(get_by_id).put(update).delete(delete),
        )
        .route("/api/institutions/{id}/users", get(list_users))
}

async fn list(State(state): State<AppState>) -> AppResult<Json<Vec<Institution>>> {
    Ok(Json(state.accounts.list_institutions().await?))
}

async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Institution>> {
    Ok(Json(state.accounts.get_institution(id).await?))
}

async fn create(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Json(payload): Json<InstitutionCreate>,
) -> AppResult<Json<Institution>> {
    Ok(Json(state.accounts.create_institution(payload).await?))
}

async fn update(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<i64>,
    Json(payload): Json<InstitutionUpdate>,
) -> AppResult<Json<Institution>> {
    Ok(Json(state.accounts.update_institution(id, payload).await?))
}

async fn delete(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<i64>,
) -> AppResult<Json<SuccessResponse>> {
    state.accounts.delete_institution(id).await?;
    Ok(Json(SuccessResponse { success: true }))
}

async fn list_users(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<i64>,
) -> AppResult<Json<Vec<UserDto>>> {
    Ok(Json(state.accounts.institution_users(id).await?))
}
