//! Business services
//!
//! Each service owns an `Arc<dyn Database>` and returns
//! [`ServiceResult`](crate::error::ServiceResult); handlers convert into
//! `AppError` with `?`.

pub mod accounts;
pub mod catalog;
pub mod credentials;
pub mod orders;

pub use accounts::AccountService;
pub use catalog::CatalogService;
pub use credentials::CredentialService;
pub use orders::OrderService;
