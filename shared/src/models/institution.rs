//! Institution Model

use serde::{Deserialize, Serialize};

/// Customer organization that places orders
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Institution {
    pub id: i64,
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub contact_name: Option<String>,
    pub created_at: i64,
}

/// Create / replace institution payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstitutionCreate {
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub contact_name: Option<String>,
}

/// Institution updates replace every field, as the create payload does
pub type InstitutionUpdate = InstitutionCreate;
