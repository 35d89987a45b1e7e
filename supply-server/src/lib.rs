//! Supply Server - institutional supply ordering service
//!
//! # Module layout
//!
//! ```text
//! supply-server/src/
//! ├── config.rs      # environment configuration
//! ├── state.rs       # AppState wiring
//! ├── auth/          # JWT service and request extractors
//! ├── services/      # orders, credentials, catalog, accounts
//! ├── db/            # store traits, PostgreSQL and in-memory backends
//! ├── email/         # password reset delivery (SES / log)
//! ├── api/           # axum routes and handlers
//! └── seed.rs        # demo data
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod email;
pub mod error;
pub mod seed;
pub mod services;
pub mod state;
pub mod util;

pub use auth::{CurrentUser, JwtService};
pub use config::Config;
pub use error::{ServiceError, ServiceResult};
pub use state::AppState;

pub use shared::error::{AppError, AppResult, ErrorBody, ErrorCategory, ErrorCode};

/// Structured security event on the `security` target
#[macro_export]
macro_rules! security_log {
    ($level:expr, $event:expr, $($key:ident = $value:expr),*) => {
        tracing::info!(
            target: "security",
            level = $level,
            event = $event,
            $($key = $value),*
        );
    };
}
