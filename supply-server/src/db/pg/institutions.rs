use async_trait::async_trait;
use shared::models::{Institution, InstitutionCreate, InstitutionUpdate};

use super::PgStore;
use crate::db::{InstitutionStore, RepoResult};

const INSTITUTION_COLUMNS: &str = "id, name, address, phone, contact_name, created_at";

#[async_trait]
impl InstitutionStore for PgStore {
    async fn list_institutions(&self) -> RepoResult<Vec<Institution>> {
        let rows = sqlx::query_as(&format!(
            "SELECT {INSTITUTION_COLUMNS} FROM institutions ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn find_institution(&self, id: i64) -> RepoResult<Option<Institution>> {
        let row = sqlx::query_as(&format!(
            "SELECT {INSTITUTION_COLUMNS} FROM institutions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn insert_institution(
        &self,
        data: InstitutionCreate,
        now: i64,
    ) -> RepoResult<Institution> {
        let row = sqlx::query_as(&format!(
            "INSERT INTO institutions (name, address, phone, contact_name, created_at)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {INSTITUTION_COLUMNS}"
        ))
        .bind(&data.name)
        .bind(&data.address)
        .bind(&data.phone)
        .bind(&data.contact_name)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn update_institution(
        &self,
        id: i64,
        data: InstitutionUpdate,
    ) -> RepoResult<Option<Institution>> {
        let row = sqlx::query_as(&format!(
            "UPDATE institutions SET name = $2, address = $3, phone = $4, contact_name = $5
             WHERE id = $1
             RETURNING {INSTITUTION_COLUMNS}"
        ))
        .bind(id)
        .bind(&data.name)
        .bind(&data.address)
        .bind(&data.phone)
        .bind(&data.contact_name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn delete_institution(&self, id: i64) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM institutions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
