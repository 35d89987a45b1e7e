//! User routes
//!
//! `/api/users/me` needs any bearer token; `GET /api/users/{id}` is open to
//! the user themselves and to admins; everything else is admin only.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use shared::error::{AppError, AppResult};
use shared::models::{Capability, SuccessResponse, UserCreate, UserDto, UserUpdate};

use crate::auth::{CurrentUser, RequireAdmin};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/users", get(list).post(create))
        .route("/api/users/me", get(me))
        .route("/api/users/{id}", get(get_by_id).put(update).delete(delete))
}

async fn list(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> AppResult<Json<Vec<UserDto>>> {
    Ok(Json(state.accounts.list_users().await?))
}

async fn me(State(state): State<AppState>, user: CurrentUser) -> AppResult<Json<UserDto>> {
    Ok(Json(state.accounts.get_user(user.id).await?))
}

async fn get_by_id(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Json<UserDto>> {
    if user.id != id && !user.can(Capability::ManageUsers) {
        return Err(AppError::permission_denied("Cannot read another user's profile"));
    }
    Ok(Json(state.accounts.get_user(id).await?))
}

async fn create(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Json(payload): Json<UserCreate>,
) -> AppResult<Json<UserDto>> {
    Ok(Json(state.accounts.create_user(payload).await?))
}

async fn update(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<i64>,
    Json(payload): Json<UserUpdate>,
) -> AppResult<Json<UserDto>> {
    Ok(Json(state.accounts.update_user(id, payload).await?))
}

async fn delete(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<i64>,
) -> AppResult<Json<SuccessResponse>> {
    if admin.id == id {
        return Err(AppError::invalid_request("Administrators cannot delete themselves"));
    }
    state.accounts.delete_user(id).await?;
    Ok(Json(SuccessResponse { success: true }))
}
