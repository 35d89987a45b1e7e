//! Service-layer error type
//!
//! `ServiceError` bridges store errors ([`RepoError`]) and the API error
//! ([`AppError`]) so services can use `?` on both.

use axum::response::IntoResponse;
use shared::error::{AppError, ErrorCode};

use crate::db::RepoError;

/// Service-layer error
///
/// - `Repo`: store/infrastructure errors (logged, mapped to a 5xx unless the
///   call site translated them first)
/// - `App`: business-rule errors (passed through to the client)
#[derive(Debug)]
pub enum ServiceError {
    Repo(RepoError),
    App(AppError),
}

impl From<RepoError> for ServiceError {
    fn from(e: RepoError) -> Self {
        ServiceError::Repo(e)
    }
}

impl From<AppError> for ServiceError {
    fn from(e: AppError) -> Self {
        ServiceError::App(e)
    }
}

impl From<ServiceError> for AppError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::App(app_err) => app_err,
            ServiceError::Repo(RepoError::NotFound) => AppError::new(ErrorCode::NotFound),
            ServiceError::Repo(RepoError::Duplicate(what)) => {
                AppError::already_exists(what)
            }
            ServiceError::Repo(RepoError::InUse(what)) => AppError::with_message(
                ErrorCode::ResourceInUse,
                format!("{what} is still referenced"),
            ),
            ServiceError::Repo(err @ RepoError::Database(_)) => {
                tracing::error!(error = %err, "Service database error");
                AppError::new(ErrorCode::DatabaseError)
            }
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> axum::response::Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
