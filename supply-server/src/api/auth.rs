//! Authentication routes
//!
//! | Path | Method | Auth |
//! |------|--------|------|
//! | /api/auth/register | POST | none |
//! | /api/auth/login | POST | none |
//! | /api/auth/forgot-password | POST | none |
//! | /api/auth/reset-password | POST | none |

use axum::{Json, Router, extract::State, routing::post};
use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{
    ForgotPasswordRequest, LoginRequest, MessageResponse, RegisterRequest, ResetPasswordRequest,
    TokenResponse,
};

use crate::state::AppState;

/// Same answer whether or not the email is known
pub const RESET_REQUESTED_MESSAGE: &str =
    "If the email is registered, a password reset code has been sent.";
pub const PASSWORD_CHANGED_MESSAGE: &str = "Password changed successfully.";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/forgot-password", post(forgot_password))
        .route("/api/auth/reset-password", post(reset_password))
}

fn required(value: &str, field: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(
            AppError::with_message(ErrorCode::RequiredField, format!("{field} is required"))
                .with_detail("field", field),
        );
    }
    Ok(())
}

/// POST /api/auth/register
async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> AppResult<Json<TokenResponse>> {
    required(&req.email, "email")?;
    required(&req.password, "password")?;
    let token = state.credentials.register(req).await?;
    Ok(Json(TokenResponse { token }))
}

/// POST /api/auth/login
async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Json<TokenResponse>> {
    required(&req.email, "email")?;
    required(&req.password, "password")?;
    let token = state.credentials.login(req).await?;
    Ok(Json(TokenResponse { token }))
}

/// POST /api/auth/forgot-password
async fn forgot_password(
    State(state): State<AppState>,
    Json(req): Json<ForgotPasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    required(&req.email, "email")?;
    state.credentials.request_password_reset(&req.email).await?;
    Ok(Json(MessageResponse::new(RESET_REQUESTED_MESSAGE)))
}

/// POST /api/auth/reset-password
async fn reset_password(
    State(state): State<AppState>,
    Json(req): Json<ResetPasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    required(&req.token, "token")?;
    required(&req.new_password, "newPassword")?;

    if !state
        .credentials
        .reset_password(req.token.trim(), &req.new_password)
        .await?
    {
        return Err(AppError::new(ErrorCode::ResetTokenInvalid));
    }
    Ok(Json(MessageResponse::new(PASSWORD_CHANGED_MESSAGE)))
}
