//! REST surface
//!
//! | Module | Prefix |
//! |--------|--------|
//! | [`health`] | `/health` |
//! | [`auth`] | `/api/auth` |
//! | [`orders`] | `/api/order` |
//! | [`products`] | `/api/products` |
//! | [`categories`] | `/api/categories` |
//! | [`institutions`] | `/api/institutions` |
//! | [`users`] | `/api/users` |
//! | [`audit`] | `/api/auditlogs` |

pub mod audit;
pub mod auth;
pub mod categories;
pub mod health;
pub mod institutions;
pub mod orders;
pub mod products;
pub mod users;

use axum::Router;
use http::{HeaderValue, Method, header};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::state::AppState;

/// Every route, without state
pub fn build_app() -> Router<AppState> {
    Router::<AppState>::new()
        .merge(health::router())
        .merge(auth::router())
        .merge(orders::router())
        .merge(products::router())
        .merge(categories::router())
        .merge(institutions::router())
        .merge(users::router())
        .merge(audit::router())
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

/// Router with state and the tower-http layers applied
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);
    build_app()
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
