//! Product and category administration

use std::sync::Arc;

use rust_decimal::Decimal;
use shared::error::{AppError, ErrorCode};
use shared::money;
use shared::models::{
    Category, CategoryCreate, CategoryUpdate, Product, ProductCreate, ProductUpdate,
};

use crate::db::Database;
use crate::error::ServiceResult;

#[derive(Clone)]
pub struct CatalogService {
    db: Arc<dyn Database>,
}

/// Returns the price rescaled to two decimal places
fn check_price(price: Decimal) -> Result<Decimal, AppError> {
    if price.is_sign_negative() && !price.is_zero() {
        return Err(AppError::with_message(
            ErrorCode::ProductInvalidPrice,
            format!("Price must not be negative, got {price}"),
        ));
    }
    if !money::has_money_scale(price) {
        return Err(AppError::with_message(
            ErrorCode::ProductInvalidPrice,
            format!("Price must have at most {} decimal places, got {price}", money::DECIMAL_PLACES),
        ));
    }
    if price > money::MAX_PRICE {
        return Err(AppError::with_message(
            ErrorCode::ProductInvalidPrice,
            format!("Price must not exceed {}, got {price}", money::MAX_PRICE),
        ));
    }
    Ok(money::to_money(price.abs()))
}

fn check_stock(stock: Option<i32>) -> Result<(), AppError> {
    match stock {
        Some(s) if s < 0 => Err(AppError::with_message(
            ErrorCode::InvalidStock,
            format!("Stock must not be negative, got {s}"),
        )),
        _ => Ok(()),
    }
}

fn check_name(name: &str) -> Result<(), AppError> {
    if name.trim().is_empty() {
        return Err(AppError::with_message(ErrorCode::RequiredField, "Name is required"));
    }
    Ok(())
}

fn product_missing(id: i64) -> AppError {
    AppError::not_found(format!("Product {id}"))
}

fn category_missing(id: i64) -> AppError {
    AppError::with_message(ErrorCode::CategoryNotFound, format!("Category {id} not found"))
}

impl CatalogService {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    async fn require_category(&self, id: i64) -> ServiceResult<()> {
        match self.db.find_category(id).await? {
            Some(_) => Ok(()),
            None => Err(category_missing(id).into()),
        }
    }

    // ── Products ──

    pub async fn list_products(&self) -> ServiceResult<Vec<Product>> {
        Ok(self.db.list_products().await?)
    }

    pub async fn get_product(&self, id: i64) -> ServiceResult<Product> {
        self.db
            .find_product(id)
            .await?
            .ok_or_else(|| product_missing(id).into())
    }

    pub async fn create_product(&self, mut data: ProductCreate) -> ServiceResult<Product> {
        check_name(&data.name)?;
        data.price = check_price(data.price)?;
        check_stock(data.stock)?;
        self.require_category(data.category_id).await?;

        let product = self.db.insert_product(data).await?;
        tracing::info!(product_id = product.id, name = %product.name, "Product created");
        Ok(product)
    }

    pub async fn update_product(&self, id: i64, mut data: ProductUpdate) -> ServiceResult<Product> {
        if let Some(name) = &data.name {
            check_name(name)?;
        }
        if let Some(price) = data.price {
            data.price = Some(check_price(price)?);
        }
        if let Some(category_id) = data.category_id {
            self.require_category(category_id).await?;
        }

        let product = self
            .db
            .update_product(id, data)
            .await?
            .ok_or_else(|| product_missing(id))?;
        tracing::info!(product_id = id, "Product updated");
        Ok(product)
    }

    /// Soft delete; existing orders keep referencing the product
    pub async fn delete_product(&self, id: i64) -> ServiceResult<()> {
        if !self.db.deactivate_product(id).await? {
            return Err(product_missing(id).into());
        }
        tracing::info!(product_id = id, "Product deactivated");
        Ok(())
    }

    /// Set tracked stock, or switch tracking off with `None`
    pub async fn set_stock(&self, id: i64, stock: Option<i32>) -> ServiceResult<Product> {
        check_stock(stock)?;
        let product = self
            .db
            .set_product_stock(id, stock)
            .await?
            .ok_or_else(|| product_missing(id))?;
        tracing::info!(product_id = id, stock = ?stock, "Product stock set");
        Ok(product)
    }

    // ── Categories ──

    pub async fn list_categories(&self) -> ServiceResult<Vec<Category>> {
        Ok(self.db.list_categories().await?)
    }

    pub async fn get_category(&self, id: i64) -> ServiceResult<Category> {
        self.db
            .find_category(id)
            .await?
            .ok_or_else(|| category_missing(id).into())
    }

    pub async fn create_category(&self, data: CategoryCreate) -> ServiceResult<Category> {
        check_name(&data.name)?;
        Ok(self.db.insert_category(data).await?)
    }

    pub async fn update_category(&self, id: i64, data: CategoryUpdate) -> ServiceResult<Category> {
        check_name(&data.name)?;
        self.db
            .update_category(id, data)
            .await?
            .ok_or_else(|| category_missing(id).into())
    }

    /// Fails with `ResourceInUse` while products reference the category
    pub async fn delete_category(&self, id: i64) -> ServiceResult<()> {
        if !self.db.delete_category(id).await? {
            return Err(category_missing(id).into());
        }
        tracing::info!(category_id = id, "Category deleted");
        Ok(())
    }
}
