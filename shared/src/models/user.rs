//! User Model

use serde::{Deserialize, Serialize};

/// Closed set of roles a user can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Role {
    Admin,
    #[default]
    Institution,
}

/// Actions gated at the REST boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Place and read orders for one's own institution
    PlaceOrders,
    /// Read orders of any institution
    ViewAllOrders,
    /// Approve, ship, cancel or reject orders
    ManageOrders,
    /// Read and administer other users' accounts
    ManageUsers,
    ViewAuditLog,
}

impl Role {
    /// Parse from database string value
    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "Admin" => Some(Self::Admin),
            "Institution" => Some(Self::Institution),
            _ => None,
        }
    }

    /// Database string representation
    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Admin => "Admin",
            Self::Institution => "Institution",
        }
    }

    pub fn allows(&self, capability: Capability) -> bool {
        match self {
            Self::Admin => true,
            Self::Institution => matches!(capability, Capability::PlaceOrders),
        }
    }
}

/// User row, including the password hash
///
/// Never serialized to clients; convert to [`UserDto`] first.
#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub institution_id: Option<i64>,
    pub full_name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub created_at: i64,
}

/// User as returned by the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    pub id: i64,
    pub institution_id: Option<i64>,
    pub full_name: String,
    pub email: String,
    pub role: Role,
    pub created_at: i64,
}

impl From<User> for UserDto {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            institution_id: u.institution_id,
            full_name: u.full_name,
            email: u.email,
            role: u.role,
            created_at: u.created_at,
        }
    }
}

/// Admin-side create user payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserCreate {
    pub institution_id: Option<i64>,
    pub full_name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: Role,
}

/// Admin-side update user payload
///
/// Every field but `password` is replaced; an empty or missing password
/// keeps the current hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdate {
    pub institution_id: Option<i64>,
    pub full_name: String,
    pub email: String,
    #[serde(default)]
    pub role: Role,
    pub password: Option<String>,
}

/// `POST /api/auth/register`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub institution_id: Option<i64>,
    pub role: Option<Role>,
}

/// `POST /api/auth/login`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}

/// Plain `{ "message": ... }` body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
