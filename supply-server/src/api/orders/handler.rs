//! Order API handlers

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{
    Capability, CreateOrderRequest, OrderDto, OrderStatus, SuccessResponse, UpdateStatusRequest,
};

use crate::auth::CurrentUser;
use crate::security_log;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub institution_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepeatQuery {
    /// Defaults to the caller
    pub new_user_id: Option<i64>,
}

fn order_missing(id: i64) -> AppError {
    AppError::with_message(ErrorCode::OrderNotFound, format!("Order {id} not found"))
}

fn require_institution(user: &CurrentUser, institution_id: i64) -> AppResult<()> {
    if !user.can_access_institution(institution_id) {
        security_log!(
            "WARN",
            "institution_denied",
            user_id = user.id,
            institution_id = institution_id
        );
        return Err(AppError::permission_denied(
            "Orders of another institution are not accessible",
        ));
    }
    Ok(())
}

/// Non-privileged callers act only as themselves
fn require_self(user: &CurrentUser, user_id: i64) -> AppResult<()> {
    if user.id != user_id && !user.can(Capability::ViewAllOrders) {
        return Err(AppError::permission_denied(
            "Orders can only be placed or listed for yourself",
        ));
    }
    Ok(())
}

/// POST /api/order
pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<CreateOrderRequest>,
) -> AppResult<Json<OrderDto>> {
    if !user.can(Capability::PlaceOrders) {
        return Err(AppError::permission_denied("Caller may not place orders"));
    }
    require_institution(&user, req.institution_id)?;
    require_self(&user, req.user_id)?;

    let order = state.orders.create_order(req).await?;
    Ok(Json(order))
}

/// GET /api/order?institutionId=
pub async fn list(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Vec<OrderDto>>> {
    let institution_id = if user.can(Capability::ViewAllOrders) {
        query.institution_id
    } else {
        let own = user.institution_id.ok_or_else(|| {
            AppError::permission_denied("Caller is not attached to an institution")
        })?;
        if let Some(requested) = query.institution_id {
            require_institution(&user, requested)?;
        }
        Some(own)
    };

    let orders = state.orders.list_orders(institution_id).await?;
    Ok(Json(orders))
}

/// GET /api/order/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Json<OrderDto>> {
    let order = state
        .orders
        .get_order(id)
        .await?
        .ok_or_else(|| order_missing(id))?;
    require_institution(&user, order.institution_id)?;
    Ok(Json(order))
}

/// GET /api/order/user/{user_id}
pub async fn list_by_user(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(user_id): Path<i64>,
) -> AppResult<Json<Vec<OrderDto>>> {
    require_self(&user, user_id)?;
    let orders = state.orders.list_orders_by_user(user_id).await?;
    Ok(Json(orders))
}

/// POST /api/order/repeat/{order_id}?newUserId=
pub async fn repeat(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(order_id): Path<i64>,
    Query(query): Query<RepeatQuery>,
) -> AppResult<Json<OrderDto>> {
    let new_user_id = query.new_user_id.unwrap_or(user.id);
    require_self(&user, new_user_id)?;

    let original = state
        .orders
        .get_order(order_id)
        .await?
        .ok_or_else(|| order_missing(order_id))?;
    require_institution(&user, original.institution_id)?;

    let order = state.orders.repeat_order(order_id, new_user_id).await?;
    Ok(Json(order))
}

/// PUT /api/order/{id}/status
pub async fn update_status(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    Json(req): Json<UpdateStatusRequest>,
) -> AppResult<Json<SuccessResponse>> {
    if !user.can(Capability::ManageOrders) {
        return Err(AppError::permission_denied("Changing order status requires an administrator"));
    }

    let new_status = OrderStatus::from_db(req.new_status.trim()).ok_or_else(|| {
        AppError::with_message(
            ErrorCode::InvalidStatus,
            format!("Unknown order status '{}'", req.new_status),
        )
    })?;

    if !state.orders.update_order_status(id, new_status).await? {
        return Err(order_missing(id));
    }
    Ok(Json(SuccessResponse { success: true }))
}
