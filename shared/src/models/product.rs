//! Product Model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Product entity
///
/// `stock = None` means the product is not stock-tracked and can be
/// ordered in any quantity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: i64,
    pub category_id: i64,
    pub name: String,
    pub description: Option<String>,
    /// Unit price, 2 decimals
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub unit: Option<String>,
    pub image_url: Option<String>,
    pub is_active: bool,
    pub stock: Option<i32>,

    /// Populated by joined reads, absent on plain row loads
    #[cfg_attr(feature = "db", sqlx(default))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_name: Option<String>,
}

impl Product {
    /// Whether `quantity` can be taken from this product's stock
    pub fn has_stock_for(&self, quantity: i32) -> bool {
        self.stock.is_none_or(|s| quantity <= s)
    }
}

/// Create product payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductCreate {
    pub category_id: i64,
    pub name: String,
    pub description: Option<String>,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub unit: Option<String>,
    pub image_url: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub stock: Option<i32>,
}

fn default_true() -> bool {
    true
}

/// Update product payload (stock is changed through its own endpoint)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductUpdate {
    pub category_id: Option<i64>,
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub price: Option<Decimal>,
    pub unit: Option<String>,
    pub image_url: Option<String>,
    pub is_active: Option<bool>,
}

/// `PUT /api/products/{id}/stock` body; `null` switches tracking off
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockUpdate {
    pub new_stock: Option<i32>,
}
