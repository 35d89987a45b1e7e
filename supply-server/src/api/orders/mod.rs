//! Order routes
//!
//! | Path | Method | Auth |
//! |------|--------|------|
//! | /api/order | POST | bearer |
//! | /api/order?institutionId= | GET | bearer |
//! | /api/order/{id} | GET | bearer |
//! | /api/order/user/{user_id} | GET | bearer |
//! | /api/order/repeat/{order_id}?newUserId= | POST | bearer |
//! | /api/order/{id}/status | PUT | `ManageOrders` |
//!
//! Callers without `ViewAllOrders` only see and place orders of their own
//! institution.

mod handler;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().nest("/api/order", order_routes())
}

fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handler::list).post(handler::create))
        .route("/{id}", get(handler::get_by_id))
        .route("/{id}/status", put(handler::update_status))
        .route("/user/{user_id}", get(handler::list_by_user))
        .route("/repeat/{order_id}", post(handler::repeat))
}
