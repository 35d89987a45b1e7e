use async_trait::async_trait;
use shared::models::{Role, User};

use super::PgStore;
use crate::db::{NewUser, PasswordResetToken, RepoError, RepoResult, UserChanges, UserStore};

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    institution_id: Option<i64>,
    full_name: String,
    email: String,
    password_hash: String,
    role: String,
    created_at: i64,
}

impl TryFrom<UserRow> for User {
    type Error = RepoError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role = Role::from_db(&row.role)
            .ok_or_else(|| RepoError::Database(format!("unknown role '{}'", row.role)))?;
        Ok(User {
            id: row.id,
            institution_id: row.institution_id,
            full_name: row.full_name,
            email: row.email,
            password_hash: row.password_hash,
            role,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ResetTokenRow {
    id: i64,
    user_id: i64,
    token_hash: String,
    expires_at: i64,
    created_at: i64,
}

const USER_COLUMNS: &str =
    "id, institution_id, full_name, email, password_hash, role, created_at";

fn into_users(rows: Vec<UserRow>) -> RepoResult<Vec<User>> {
    rows.into_iter().map(User::try_from).collect()
}

#[async_trait]
impl UserStore for PgStore {
    async fn find_user(&self, id: i64) -> RepoResult<Option<User>> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        row.map(User::try_from).transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
                .bind(email)
                .fetch_optional(&self.pool)
                .await?;
        row.map(User::try_from).transpose()
    }

    async fn list_users(&self) -> RepoResult<Vec<User>> {
        let rows: Vec<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY id"))
                .fetch_all(&self.pool)
                .await?;
        into_users(rows)
    }

    async fn list_users_by_institution(&self, institution_id: i64) -> RepoResult<Vec<User>> {
        let rows: Vec<UserRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE institution_id = $1 ORDER BY id"
        ))
        .bind(institution_id)
        .fetch_all(&self.pool)
        .await?;
        into_users(rows)
    }

    async fn insert_user(&self, user: NewUser) -> RepoResult<User> {
        let row: UserRow = sqlx::query_as(&format!(
            "INSERT INTO users (institution_id, full_name, email, password_hash, role, created_at)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(user.institution_id)
        .bind(&user.full_name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_db())
        .bind(user.created_at)
        .fetch_one(&self.pool)
        .await?;
        row.try_into()
    }

    async fn update_user(&self, id: i64, changes: UserChanges) -> RepoResult<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "UPDATE users
             SET institution_id = $2, full_name = $3, email = $4, role = $5,
                 password_hash = COALESCE($6, password_hash)
             WHERE id = $1
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(changes.institution_id)
        .bind(&changes.full_name)
        .bind(&changes.email)
        .bind(changes.role.as_db())
        .bind(changes.password_hash.as_deref())
        .fetch_optional(&self.pool)
        .await?;
        row.map(User::try_from).transpose()
    }

    async fn delete_user(&self, id: i64) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn replace_reset_token(
        &self,
        user_id: i64,
        token_hash: &str,
        expires_at: i64,
        created_at: i64,
    ) -> RepoResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM password_reset_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO password_reset_tokens (user_id, token_hash, expires_at, created_at)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(user_id)
        .bind(token_hash)
        .bind(expires_at)
        .bind(created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn find_reset_token(&self, token_hash: &str) -> RepoResult<Option<PasswordResetToken>> {
        let row: Option<ResetTokenRow> = sqlx::query_as(
            "SELECT id, user_id, token_hash, expires_at, created_at
             FROM password_reset_tokens WHERE token_hash = $1",
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| PasswordResetToken {
            id: r.id,
            user_id: r.user_id,
            token_hash: r.token_hash,
            expires_at: r.expires_at,
            created_at: r.created_at,
        }))
    }

    async fn consume_reset_token(&self, token_id: i64, password_hash: &str) -> RepoResult<bool> {
        let mut tx = self.pool.begin().await?;

        // DELETE ... RETURNING makes concurrent consumers race on the row lock;
        // only one of them sees the user id.
        let owner: Option<(i64,)> =
            sqlx::query_as("DELETE FROM password_reset_tokens WHERE id = $1 RETURNING user_id")
                .bind(token_id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some((user_id,)) = owner else {
            return Ok(false);
        };

        let updated = sqlx::query("UPDATE users SET password_hash = $1 WHERE id = $2")
            .bind(password_hash)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        if updated.rows_affected() == 0 {
            return Ok(false);
        }

        tx.commit().await?;
        Ok(true)
    }
}
