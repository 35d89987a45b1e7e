//! Credential manager
//!
//! Registration, login, bearer tokens and the password reset flow.
//! Reset tokens are opaque random strings; only their SHA-256 digest is
//! stored, and a new request replaces any outstanding token of the user.

use std::sync::Arc;

use shared::error::{AppError, ErrorCode};
use shared::models::{LoginRequest, RegisterRequest, Role, User};

use crate::auth::{Claims, JwtError, JwtService};
use crate::db::{Database, NewUser, RepoError};
use crate::email::Notifier;
use crate::error::{ServiceError, ServiceResult};
use crate::security_log;
use crate::util::{
    MIN_PASSWORD_LEN, RESET_TOKEN_TTL_MS, generate_reset_token, hash_password, hash_token,
    normalize_email, now_millis, verify_password,
};

#[derive(Clone)]
pub struct CredentialService {
    db: Arc<dyn Database>,
    jwt: Arc<JwtService>,
    notifier: Arc<dyn Notifier>,
    allow_admin_registration: bool,
}

pub(crate) fn check_password(password: &str) -> Result<(), AppError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::new(ErrorCode::PasswordTooShort));
    }
    Ok(())
}

pub(crate) fn check_email(email: &str) -> Result<(), AppError> {
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::validation("Invalid email"));
    }
    Ok(())
}

pub(crate) fn hash(password: &str) -> Result<String, AppError> {
    hash_password(password).map_err(|e| {
        tracing::error!(error = %e, "Password hash error");
        AppError::internal("Internal error")
    })
}

/// Unique-email violations surface as `EmailAlreadyExists`
pub(crate) fn email_conflict(err: RepoError) -> ServiceError {
    match err {
        RepoError::Duplicate(_) => AppError::new(ErrorCode::EmailAlreadyExists).into(),
        other => other.into(),
    }
}

impl CredentialService {
    pub fn new(db: Arc<dyn Database>, jwt: Arc<JwtService>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            db,
            jwt,
            notifier,
            allow_admin_registration: false,
        }
    }

    /// Whether anonymous registration may request `Role::Admin`
    pub fn allow_admin_registration(mut self, allow: bool) -> Self {
        self.allow_admin_registration = allow;
        self
    }

    /// Create a user and return a bearer token for it
    pub async fn register(&self, req: RegisterRequest) -> ServiceResult<String> {
        let email = normalize_email(&req.email);
        let full_name = req.full_name.trim().to_string();

        check_email(&email)?;
        if full_name.is_empty() {
            return Err(AppError::with_message(ErrorCode::RequiredField, "Full name is required").into());
        }
        check_password(&req.password)?;

        let role = req.role.unwrap_or_default();
        if role == Role::Admin && !self.allow_admin_registration {
            security_log!("WARN", "admin_self_registration", email = email.clone());
            return Err(AppError::with_message(
                ErrorCode::AdminRequired,
                "Admin accounts can only be created by an administrator",
            )
            .into());
        }

        if self.db.find_user_by_email(&email).await?.is_some() {
            return Err(AppError::new(ErrorCode::EmailAlreadyExists).into());
        }
        if let Some(institution_id) = req.institution_id
            && self.db.find_institution(institution_id).await?.is_none()
        {
            return Err(AppError::with_message(
                ErrorCode::InstitutionNotFound,
                format!("Institution {institution_id} not found"),
            )
            .into());
        }

        let user = self
            .db
            .insert_user(NewUser {
                institution_id: req.institution_id,
                full_name,
                email,
                password_hash: hash(&req.password)?,
                role,
                created_at: now_millis(),
            })
            .await
            .map_err(email_conflict)?;

        tracing::info!(user_id = user.id, role = role.as_db(), "User registered");
        self.audit(Some(user.id), "user_registered", format!("email={}", user.email))
            .await;

        self.issue_token(&user)
    }

    /// Exchange email + password for a bearer token
    ///
    /// Unknown email and wrong password produce the same error.
    pub async fn login(&self, req: LoginRequest) -> ServiceResult<String> {
        let email = normalize_email(&req.email);

        let user = match self.db.find_user_by_email(&email).await? {
            Some(user) if verify_password(&req.password, &user.password_hash) => user,
            _ => {
                security_log!("WARN", "login_failed", email = email.clone());
                return Err(AppError::invalid_credentials().into());
            }
        };

        tracing::info!(user_id = user.id, "User logged in");
        self.audit(Some(user.id), "login", String::new()).await;

        self.issue_token(&user)
    }

    /// Issue a reset token and mail it, if the email belongs to a user.
    ///
    /// Succeeds whether or not the user exists; delivery failures are only
    /// logged.
    pub async fn request_password_reset(&self, email: &str) -> ServiceResult<()> {
        let email = normalize_email(email);
        let Some(user) = self.db.find_user_by_email(&email).await? else {
            security_log!("INFO", "reset_unknown_email", email = email.clone());
            return Ok(());
        };

        let token = generate_reset_token();
        let now = now_millis();
        self.db
            .replace_reset_token(user.id, &hash_token(&token), now + RESET_TOKEN_TTL_MS, now)
            .await?;

        if let Err(e) = self
            .notifier
            .send_password_reset(&user.email, &user.full_name, &token)
            .await
        {
            tracing::error!(user_id = user.id, error = %e, "Failed to send password reset mail");
        }

        tracing::info!(user_id = user.id, "Password reset requested");
        Ok(())
    }

    /// Consume a reset token and set a new password.
    ///
    /// Returns `false` for unknown, expired or already used tokens.
    pub async fn reset_password(&self, token: &str, new_password: &str) -> ServiceResult<bool> {
        let Some(stored) = self.db.find_reset_token(&hash_token(token)).await? else {
            return Ok(false);
        };
        if now_millis() >= stored.expires_at {
            security_log!("WARN", "reset_token_expired", user_id = stored.user_id);
            return Ok(false);
        }
        check_password(new_password)?;

        let password_hash = hash(new_password)?;
        if !self.db.consume_reset_token(stored.id, &password_hash).await? {
            return Ok(false);
        }

        tracing::info!(user_id = stored.user_id, "Password reset completed");
        self.audit(Some(stored.user_id), "password_reset", String::new())
            .await;
        Ok(true)
    }

    /// Validate a bearer token
    pub fn verify_token(&self, token: &str) -> Result<Claims, AppError> {
        self.jwt.validate_token(token).map_err(|e| match e {
            JwtError::ExpiredToken => AppError::token_expired(),
            other => AppError::invalid_token(other.to_string()),
        })
    }

    fn issue_token(&self, user: &User) -> ServiceResult<String> {
        self.jwt.generate_token(user).map_err(|e| {
            tracing::error!(error = %e, "Token generation failed");
            AppError::internal("Internal error").into()
        })
    }

    async fn audit(&self, user_id: Option<i64>, action: &str, details: String) {
        if let Err(e) = self
            .db
            .append_audit(user_id, action, &details, now_millis())
            .await
        {
            tracing::warn!(error = %e, action, "Failed to write audit entry");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_length_rule() {
        assert_eq!(
            check_password("short").unwrap_err().code,
            ErrorCode::PasswordTooShort
        );
        assert!(check_password("eight-ch").is_ok());
    }

    #[test]
    fn test_email_shape() {
        assert!(check_email("").is_err());
        assert!(check_email("no-at-sign").is_err());
        assert!(check_email("a@b.org").is_ok());
    }

    #[test]
    fn test_duplicate_maps_to_email_conflict() {
        let err: AppError = email_conflict(RepoError::Duplicate("email".into())).into();
        assert_eq!(err.code, ErrorCode::EmailAlreadyExists);

        let err: AppError = email_conflict(RepoError::Database("down".into())).into();
        assert_eq!(err.code, ErrorCode::DatabaseError);
    }
}
