//! PostgreSQL store (sqlx)

mod audit;
mod catalog;
mod institutions;
mod orders;
mod users;

use sqlx::PgPool;

use super::RepoError;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// PostgreSQL-backed implementation of every store trait
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect and run pending migrations
    pub async fn connect(database_url: &str) -> Result<Self, BoxError> {
        let pool = PgPool::connect(database_url).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }
}

impl From<sqlx::Error> for RepoError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            let constraint = db_err.constraint().unwrap_or_default().to_string();
            match db_err.code().as_deref() {
                // unique_violation
                Some("23505") => return RepoError::Duplicate(constraint),
                // foreign_key_violation
                Some("23503") => return RepoError::InUse(constraint),
                _ => {}
            }
        }
        RepoError::Database(err.to_string())
    }
}
