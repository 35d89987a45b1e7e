//! Shared types for the supply ordering workspace
//!
//! Common types used by the server and its API clients: the unified
//! error system, the error body, money bounds and the domain models.

pub mod error;
pub mod models;
pub mod money;
pub mod util;

// Re-exports
pub use axum::Json;
pub use http;
pub use serde::{Deserialize, Serialize};
