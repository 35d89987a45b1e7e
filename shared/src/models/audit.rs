//! Audit log Model

use serde::{Deserialize, Serialize};

/// Append-only audit entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct AuditLog {
    pub id: i64,
    pub user_id: Option<i64>,
    pub action: String,
    pub details: String,
    pub created_at: i64,
}

/// Maximum number of entries returned by the audit listing
pub const AUDIT_LIST_LIMIT: i64 = 500;
