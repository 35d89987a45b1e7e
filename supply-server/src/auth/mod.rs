//! Authentication
//!
//! - [`JwtService`] - bearer token issue/validation
//! - [`CurrentUser`] - authenticated caller, extracted per request
//! - [`RequireAdmin`] - extractor that also demands the `Admin` role

pub mod extractor;
pub mod jwt;

pub use extractor::RequireAdmin;
pub use jwt::{Claims, CurrentUser, JwtConfig, JwtError, JwtService};
