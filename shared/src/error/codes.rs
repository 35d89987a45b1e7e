//! Unified error codes for the supply ordering service
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 2xxx: Permission errors
//! - 3xxx: Institution / user errors
//! - 4xxx: Order errors
//! - 5xxx: Catalog errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values so the frontend can
/// switch on them without parsing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,
    /// Invalid request
    InvalidRequest = 5,
    /// Required field missing
    RequiredField = 7,
    /// Value out of range
    ValueOutOfRange = 8,
    /// Resource is still referenced by other records
    ResourceInUse = 9,

    // ==================== 1xxx: Auth ====================
    /// User is not authenticated
    NotAuthenticated = 1001,
    /// Invalid credentials (email/password)
    InvalidCredentials = 1002,
    /// Token has expired
    TokenExpired = 1003,
    /// Token is invalid
    TokenInvalid = 1004,
    /// Password too short
    PasswordTooShort = 1005,
    /// Password reset token unknown, consumed or expired
    ResetTokenInvalid = 1006,
    /// Email already registered
    EmailAlreadyExists = 1007,

    // ==================== 2xxx: Permission ====================
    /// Permission denied
    PermissionDenied = 2001,
    /// Admin role required
    AdminRequired = 2003,

    // ==================== 3xxx: Institution ====================
    /// Institution not found
    InstitutionNotFound = 3001,
    /// User not found
    UserNotFound = 3002,

    // ==================== 4xxx: Order ====================
    /// Order not found
    OrderNotFound = 4001,
    /// Order has no items
    OrderEmpty = 4002,
    /// Item quantity is not a positive integer
    InvalidQuantity = 4003,
    /// Unknown order status value
    InvalidStatus = 4004,
    /// Status change not allowed from the current status
    InvalidStatusTransition = 4005,

    // ==================== 5xxx: Catalog ====================
    /// Product referenced by an order does not exist
    ProductNotFound = 5001,
    /// Requested quantity exceeds available stock
    InsufficientStock = 5002,
    /// Product has invalid price
    ProductInvalidPrice = 5003,
    /// Stock value is invalid
    InvalidStock = 5004,
    /// Category not found
    CategoryNotFound = 5101,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Get the default message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::AlreadyExists => "Resource already exists",
            ErrorCode::InvalidRequest => "Invalid request",
            ErrorCode::RequiredField => "Required field is missing",
            ErrorCode::ValueOutOfRange => "Value is out of range",
            ErrorCode::ResourceInUse => "Resource is still in use",

            // Auth
            ErrorCode::NotAuthenticated => "User is not authenticated",
            ErrorCode::InvalidCredentials => "Invalid credentials",
            ErrorCode::TokenExpired => "Authentication token has expired",
            ErrorCode::TokenInvalid => "Authentication token is invalid",
            ErrorCode::PasswordTooShort => "Password must be at least 8 characters",
            ErrorCode::ResetTokenInvalid => "Invalid or expired token",
            ErrorCode::EmailAlreadyExists => "Email already in use",

            // Permission
            ErrorCode::PermissionDenied => "Permission denied",
            ErrorCode::AdminRequired => "Administrator role is required",

            // Institution
            ErrorCode::InstitutionNotFound => "Institution not found",
            ErrorCode::UserNotFound => "User not found",

            // Order
            ErrorCode::OrderNotFound => "Order not found",
            ErrorCode::OrderEmpty => "Order must contain items",
            ErrorCode::InvalidQuantity => "Quantity must be a positive integer",
            ErrorCode::InvalidStatus => "Unknown order status",
            ErrorCode::InvalidStatusTransition => "Order status change is not allowed",

            // Catalog
            ErrorCode::ProductNotFound => "One or more products not found",
            ErrorCode::InsufficientStock => "Not enough stock",
            ErrorCode::ProductInvalidPrice => "Product has invalid price",
            ErrorCode::InvalidStock => "Stock must be zero or greater",
            ErrorCode::CategoryNotFound => "Category not found",

            // System
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error returned when a u16 doesn't map to a known [`ErrorCode`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            4 => Ok(ErrorCode::AlreadyExists),
            5 => Ok(ErrorCode::InvalidRequest),
            7 => Ok(ErrorCode::RequiredField),
            8 => Ok(ErrorCode::ValueOutOfRange),
            9 => Ok(ErrorCode::ResourceInUse),

            // Auth
            1001 => Ok(ErrorCode::NotAuthenticated),
            1002 => Ok(ErrorCode::InvalidCredentials),
            1003 => Ok(ErrorCode::TokenExpired),
            1004 => Ok(ErrorCode::TokenInvalid),
            1005 => Ok(ErrorCode::PasswordTooShort),
            1006 => Ok(ErrorCode::ResetTokenInvalid),
            1007 => Ok(ErrorCode::EmailAlreadyExists),

            // Permission
            2001 => Ok(ErrorCode::PermissionDenied),
            2003 => Ok(ErrorCode::AdminRequired),

            // Institution
            3001 => Ok(ErrorCode::InstitutionNotFound),
            3002 => Ok(ErrorCode::UserNotFound),

            // Order
            4001 => Ok(ErrorCode::OrderNotFound),
            4002 => Ok(ErrorCode::OrderEmpty),
            4003 => Ok(ErrorCode::InvalidQuantity),
            4004 => Ok(ErrorCode::InvalidStatus),
            4005 => Ok(ErrorCode::InvalidStatusTransition),

            // Catalog
            5001 => Ok(ErrorCode::ProductNotFound),
            5002 => Ok(ErrorCode::InsufficientStock),
            5003 => Ok(ErrorCode::ProductInvalidPrice),
            5004 => Ok(ErrorCode::InvalidStock),
            5101 => Ok(ErrorCode::CategoryNotFound),

            // System
            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::DatabaseError),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}
