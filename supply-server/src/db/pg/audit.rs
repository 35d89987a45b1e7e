use async_trait::async_trait;
use shared::models::AuditLog;

use super::PgStore;
use crate::db::{AuditStore, RepoResult};

#[async_trait]
impl AuditStore for PgStore {
    async fn append_audit(
        &self,
        user_id: Option<i64>,
        action: &str,
        details: &str,
        now: i64,
    ) -> RepoResult<()> {
        sqlx::query(
            "INSERT INTO audit_logs (user_id, action, details, created_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(user_id)
        .bind(action)
        .bind(details)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_audit(&self, limit: i64) -> RepoResult<Vec<AuditLog>> {
        let rows = sqlx::query_as(
            "SELECT id, user_id, action, details, created_at FROM audit_logs
             ORDER BY created_at DESC, id DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
