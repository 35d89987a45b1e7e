//! Institution and user administration

use std::sync::Arc;

use shared::error::{AppError, ErrorCode};
use shared::models::{
    Institution, InstitutionCreate, InstitutionUpdate, User, UserCreate, UserDto, UserUpdate,
};

use crate::db::{Database, NewUser, UserChanges};
use crate::error::ServiceResult;
use crate::services::credentials::{check_email, check_password, email_conflict, hash};
use crate::util::{normalize_email, now_millis};

#[derive(Clone)]
pub struct AccountService {
    db: Arc<dyn Database>,
}

fn institution_missing(id: i64) -> AppError {
    AppError::with_message(
        ErrorCode::InstitutionNotFound,
        format!("Institution {id} not found"),
    )
}

fn user_missing(id: i64) -> AppError {
    AppError::with_message(ErrorCode::UserNotFound, format!("User {id} not found"))
}

fn require_text(value: &str, field: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(
            AppError::with_message(ErrorCode::RequiredField, format!("{field} is required"))
                .with_detail("field", field),
        );
    }
    Ok(())
}

impl AccountService {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    // ── Institutions ──

    pub async fn list_institutions(&self) -> ServiceResult<Vec<Institution>> {
        Ok(self.db.list_institutions().await?)
    }

    pub async fn get_institution(&self, id: i64) -> ServiceResult<Institution> {
        self.db
            .find_institution(id)
            .await?
            .ok_or_else(|| institution_missing(id).into())
    }

    pub async fn create_institution(&self, data: InstitutionCreate) -> ServiceResult<Institution> {
        require_text(&data.name, "name")?;
        let institution = self.db.insert_institution(data, now_millis()).await?;
        tracing::info!(institution_id = institution.id, "Institution created");
        Ok(institution)
    }

    pub async fn update_institution(
        &self,
        id: i64,
        data: InstitutionUpdate,
    ) -> ServiceResult<Institution> {
        require_text(&data.name, "name")?;
        self.db
            .update_institution(id, data)
            .await?
            .ok_or_else(|| institution_missing(id).into())
    }

    /// Fails with `ResourceInUse` while users or orders reference it
    pub async fn delete_institution(&self, id: i64) -> ServiceResult<()> {
        if !self.db.delete_institution(id).await? {
            return Err(institution_missing(id).into());
        }
        tracing::info!(institution_id = id, "Institution deleted");
        Ok(())
    }

    pub async fn institution_users(&self, institution_id: i64) -> ServiceResult<Vec<UserDto>> {
        self.get_institution(institution_id).await?;
        let users = self.db.list_users_by_institution(institution_id).await?;
        Ok(users.into_iter().map(UserDto::from).collect())
    }

    // ── Users ──

    async fn require_institution(&self, id: Option<i64>) -> ServiceResult<()> {
        if let Some(id) = id
            && self.db.find_institution(id).await?.is_none()
        {
            return Err(institution_missing(id).into());
        }
        Ok(())
    }

    pub async fn list_users(&self) -> ServiceResult<Vec<UserDto>> {
        let users = self.db.list_users().await?;
        Ok(users.into_iter().map(UserDto::from).collect())
    }

    pub async fn get_user(&self, id: i64) -> ServiceResult<UserDto> {
        self.find_user(id).await.map(UserDto::from)
    }

    async fn find_user(&self, id: i64) -> ServiceResult<User> {
        self.db
            .find_user(id)
            .await?
            .ok_or_else(|| user_missing(id).into())
    }

    pub async fn create_user(&self, data: UserCreate) -> ServiceResult<UserDto> {
        let email = normalize_email(&data.email);
        check_email(&email)?;
        require_text(&data.full_name, "fullName")?;
        check_password(&data.password)?;
        self.require_institution(data.institution_id).await?;

        let user = self
            .db
            .insert_user(NewUser {
                institution_id: data.institution_id,
                full_name: data.full_name.trim().to_string(),
                email,
                password_hash: hash(&data.password)?,
                role: data.role,
                created_at: now_millis(),
            })
            .await
            .map_err(email_conflict)?;

        tracing::info!(user_id = user.id, role = user.role.as_db(), "User created");
        Ok(user.into())
    }

    /// Replace a user's profile; a non-empty `password` also resets the hash
    pub async fn update_user(&self, id: i64, data: UserUpdate) -> ServiceResult<UserDto> {
        let email = normalize_email(&data.email);
        check_email(&email)?;
        require_text(&data.full_name, "fullName")?;
        self.require_institution(data.institution_id).await?;

        let password_hash = match data.password.as_deref() {
            Some(p) if !p.is_empty() => {
                check_password(p)?;
                Some(hash(p)?)
            }
            _ => None,
        };

        let user = self
            .db
            .update_user(
                id,
                UserChanges {
                    institution_id: data.institution_id,
                    full_name: data.full_name.trim().to_string(),
                    email,
                    role: data.role,
                    password_hash,
                },
            )
            .await
            .map_err(email_conflict)?
            .ok_or_else(|| user_missing(id))?;

        tracing::info!(user_id = id, "User updated");
        Ok(user.into())
    }

    /// Fails with `ResourceInUse` while the user has orders
    pub async fn delete_user(&self, id: i64) -> ServiceResult<()> {
        if !self.db.delete_user(id).await? {
            return Err(user_missing(id).into());
        }
        tracing::info!(user_id = id, "User deleted");
        Ok(())
    }
}
