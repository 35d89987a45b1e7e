//! Data models
//!
//! Shared between supply-server and its API clients.
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.
//! All IDs are `i64` (PostgreSQL BIGSERIAL), timestamps are Unix millis.

pub mod audit;
pub mod category;
pub mod institution;
pub mod order;
pub mod product;
pub mod user;

// Re-exports
pub use audit::*;
pub use category::*;
pub use institution::*;
pub use order::*;
pub use product::*;
pub use user::*;
