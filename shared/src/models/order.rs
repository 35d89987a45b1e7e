//! Order Model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Order lifecycle status
///
/// ```text
/// Pending  ──► Approved ──► Shipped ──► Completed
///   │  │          │
///   │  └► Rejected └──► Cancelled
///   └──► Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    Pending,
    Approved,
    Shipped,
    Completed,
    Cancelled,
    Rejected,
}

impl OrderStatus {
    /// Parse from database / wire string value
    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "Pending" => Some(Self::Pending),
            "Approved" => Some(Self::Approved),
            "Shipped" => Some(Self::Shipped),
            "Completed" => Some(Self::Completed),
            "Cancelled" => Some(Self::Cancelled),
            "Rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    /// Database string representation
    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Approved => "Approved",
            Self::Shipped => "Shipped",
            Self::Completed => "Completed",
            Self::Cancelled => "Cancelled",
            Self::Rejected => "Rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Rejected)
    }

    /// Whether an order may move from `self` to `next`.
    ///
    /// Re-applying the current status is not a transition; callers treat
    /// it as a no-op before consulting this table.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Approved)
                | (Pending, Cancelled)
                | (Pending, Rejected)
                | (Approved, Shipped)
                | (Approved, Cancelled)
                | (Shipped, Completed)
        )
    }

    /// Entering this status returns the order's quantities to stock
    pub fn restocks(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Rejected)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_db())
    }
}

/// One requested line of a new order
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemInput {
    pub product_id: i64,
    pub quantity: i32,
}

/// `POST /api/order`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub institution_id: i64,
    pub user_id: i64,
    #[serde(default)]
    pub items: Vec<OrderItemInput>,
}

/// Order line with the product fields resolved for display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemDto {
    pub product_id: i64,
    pub product_name: String,
    /// Unit price captured when the order was placed
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub quantity: i32,
    pub unit: Option<String>,
    pub image_url: Option<String>,
}

/// Fully materialized order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDto {
    pub id: i64,
    pub institution_id: i64,
    pub institution_name: String,
    pub user_id: i64,
    pub user_full_name: String,
    pub created_at: i64,
    pub status: OrderStatus,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
    pub items: Vec<OrderItemDto>,
}

impl OrderDto {
    /// Sum of line subtotals, for comparison against the stored total
    pub fn calculated_total(&self) -> Decimal {
        self.items
            .iter()
            .map(|i| i.price * Decimal::from(i.quantity))
            .sum()
    }
}

/// `PUT /api/order/{id}/status`
///
/// Kept as a raw string so unknown values can be rejected with a
/// validation error instead of a deserialization failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    pub new_status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
}
