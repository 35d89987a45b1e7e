//! Audit log route (admin only)

use axum::{Json, Router, extract::State, routing::get};
use shared::error::{AppError, AppResult};
use shared::models::{AUDIT_LIST_LIMIT, AuditLog, Capability};

use crate::auth::CurrentUser;
use crate::error::ServiceError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/auditlogs", get(list))
}

/// GET /api/auditlogs - most recent entries first
async fn list(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Json<Vec<AuditLog>>> {
    if !user.can(Capability::ViewAuditLog) {
        return Err(AppError::admin_required());
    }
    let entries = state
        .db
        .list_audit(AUDIT_LIST_LIMIT)
        .await
        .map_err(ServiceError::from)?;
    Ok(Json(entries))
}
