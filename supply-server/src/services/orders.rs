//! Order workflow
//!
//! Placement, repetition and status changes. Every write runs inside one
//! [`OrderTx`](crate::db::OrderTx): products are row-locked, stock is checked
//! and adjusted, and nothing is visible until commit.

use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use shared::error::{AppError, ErrorCode};
use shared::money;
use shared::models::{CreateOrderRequest, OrderDto, OrderItemInput, OrderStatus, Product};

use crate::db::{Database, NewOrder, OrderFilter, OrderItem};
use crate::error::ServiceResult;
use crate::util::now_millis;

#[derive(Clone)]
pub struct OrderService {
    db: Arc<dyn Database>,
}

/// Collapse repeated product ids, summing quantities, keeping first-seen order
fn merge_lines(items: &[OrderItemInput]) -> Result<Vec<OrderItemInput>, AppError> {
    if items.is_empty() {
        return Err(AppError::new(ErrorCode::OrderEmpty));
    }

    let mut merged: Vec<OrderItemInput> = Vec::with_capacity(items.len());
    for item in items {
        if item.quantity <= 0 {
            return Err(AppError::with_message(
                ErrorCode::InvalidQuantity,
                format!("Quantity for product {} must be positive", item.product_id),
            )
            .with_detail("product_id", item.product_id));
        }
        match merged.iter_mut().find(|m| m.product_id == item.product_id) {
            Some(existing) => {
                existing.quantity = existing.quantity.checked_add(item.quantity).ok_or_else(|| {
                    AppError::with_message(
                        ErrorCode::ValueOutOfRange,
                        format!("Quantity for product {} is too large", item.product_id),
                    )
                })?;
            }
            None => merged.push(item.clone()),
        }
    }
    Ok(merged)
}

/// Sum of price × quantity, bounded by what an order total column can hold
fn order_total(lines: &[(&Product, i32)]) -> Result<Decimal, AppError> {
    let too_large = || {
        AppError::with_message(
            ErrorCode::ValueOutOfRange,
            format!("Order total exceeds the maximum of {}", money::MAX_AMOUNT),
        )
    };
    let mut total = Decimal::ZERO;
    for (product, quantity) in lines {
        let line = product
            .price
            .checked_mul(Decimal::from(*quantity))
            .ok_or_else(too_large)?;
        total = total.checked_add(line).ok_or_else(too_large)?;
    }
    if total > money::MAX_AMOUNT {
        return Err(too_large());
    }
    Ok(money::to_money(total))
}

fn product_not_found(id: i64) -> AppError {
    AppError::with_message(ErrorCode::ProductNotFound, format!("Product {id} not found"))
        .with_detail("product_id", id)
}

impl OrderService {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    /// Place a new `Pending` order, decrementing tracked stock
    pub async fn create_order(&self, req: CreateOrderRequest) -> ServiceResult<OrderDto> {
        let lines = merge_lines(&req.items)?;

        let mut tx = self.db.begin_order_tx().await?;

        if !tx.institution_exists(req.institution_id).await? {
            return Err(AppError::with_message(
                ErrorCode::InstitutionNotFound,
                format!("Institution {} not found", req.institution_id),
            )
            .into());
        }
        if !tx.user_exists(req.user_id).await? {
            return Err(AppError::with_message(
                ErrorCode::UserNotFound,
                format!("User {} not found", req.user_id),
            )
            .into());
        }

        let ids: Vec<i64> = lines.iter().map(|l| l.product_id).collect();
        let products: HashMap<i64, Product> = tx
            .lock_products(&ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        // All checks happen before the first write.
        let mut resolved = Vec::with_capacity(lines.len());
        for line in &lines {
            let product = products
                .get(&line.product_id)
                .ok_or_else(|| product_not_found(line.product_id))?;
            if !product.has_stock_for(line.quantity) {
                let available = product.stock.unwrap_or_default();
                tracing::warn!(
                    product_id = product.id,
                    requested = line.quantity,
                    available,
                    "Order rejected: insufficient stock"
                );
                return Err(AppError::insufficient_stock(product.id, &product.name, available).into());
            }
            resolved.push((product, line.quantity));
        }
        let total_amount = order_total(&resolved)?;

        let mut items = Vec::with_capacity(resolved.len());
        for (product, quantity) in resolved {
            if let Some(stock) = product.stock {
                tx.write_stock(product.id, stock - quantity).await?;
            }
            items.push(OrderItem {
                product_id: product.id,
                quantity,
                price: product.price,
            });
        }

        let order_id = tx
            .insert_order(NewOrder {
                institution_id: req.institution_id,
                user_id: req.user_id,
                total_amount,
                status: OrderStatus::Pending,
                created_at: now_millis(),
                items,
            })
            .await?;

        tx.commit().await?;

        tracing::info!(
            order_id,
            institution_id = req.institution_id,
            user_id = req.user_id,
            total = %total_amount,
            "Order placed"
        );
        self.audit(
            Some(req.user_id),
            "order_created",
            format!("order={order_id} total={total_amount}"),
        )
        .await;

        self.db
            .order_view(order_id)
            .await?
            .ok_or_else(|| AppError::internal(format!("Order {order_id} vanished after commit")).into())
    }

    /// Re-place an earlier order's lines for `new_user_id` at current prices
    pub async fn repeat_order(&self, order_id: i64, new_user_id: i64) -> ServiceResult<OrderDto> {
        let original = self.db.find_order(order_id).await?.ok_or_else(|| {
            AppError::with_message(ErrorCode::OrderNotFound, format!("Order {order_id} not found"))
        })?;

        let req = CreateOrderRequest {
            institution_id: original.institution_id,
            user_id: new_user_id,
            items: original
                .items
                .iter()
                .map(|i| OrderItemInput {
                    product_id: i.product_id,
                    quantity: i.quantity,
                })
                .collect(),
        };

        tracing::info!(order_id, new_user_id, "Repeating order");
        self.create_order(req).await
    }

    /// Move an order to `new_status`.
    ///
    /// Returns `Ok(false)` when the order does not exist. Cancelling or
    /// rejecting returns the ordered quantities to tracked stock.
    pub async fn update_order_status(
        &self,
        order_id: i64,
        new_status: OrderStatus,
    ) -> ServiceResult<bool> {
        let mut tx = self.db.begin_order_tx().await?;

        let Some(order) = tx.lock_order(order_id).await? else {
            return Ok(false);
        };

        if order.status == new_status {
            return Ok(true);
        }
        if !order.status.can_transition_to(new_status) {
            return Err(AppError::with_message(
                ErrorCode::InvalidStatusTransition,
                format!("Cannot move order from {} to {}", order.status, new_status),
            )
            .with_detail("from", order.status.as_db())
            .with_detail("to", new_status.as_db())
            .into());
        }

        if new_status.restocks() {
            let ids: Vec<i64> = order.items.iter().map(|i| i.product_id).collect();
            let products: HashMap<i64, Product> = tx
                .lock_products(&ids)
                .await?
                .into_iter()
                .map(|p| (p.id, p))
                .collect();

            let mut returned: HashMap<i64, i32> = HashMap::new();
            for item in &order.items {
                *returned.entry(item.product_id).or_default() += item.quantity;
            }
            for (product_id, quantity) in returned {
                // Untracked or since-removed products have nothing to restore.
                if let Some(stock) = products.get(&product_id).and_then(|p| p.stock) {
                    tx.write_stock(product_id, stock.saturating_add(quantity)).await?;
                }
            }
        }

        tx.write_order_status(order_id, new_status).await?;
        tx.commit().await?;

        tracing::info!(order_id, from = %order.status, to = %new_status, "Order status changed");
        self.audit(
            None,
            "order_status_changed",
            format!("order={order_id} {} -> {}", order.status, new_status),
        )
        .await;
        Ok(true)
    }

    pub async fn get_order(&self, order_id: i64) -> ServiceResult<Option<OrderDto>> {
        Ok(self.db.order_view(order_id).await?)
    }

    /// All orders, or those of one institution; newest first
    pub async fn list_orders(&self, institution_id: Option<i64>) -> ServiceResult<Vec<OrderDto>> {
        let filter = match institution_id {
            Some(id) => OrderFilter::Institution(id),
            None => OrderFilter::All,
        };
        Ok(self.db.list_order_views(filter).await?)
    }

    pub async fn list_orders_by_user(&self, user_id: i64) -> ServiceResult<Vec<OrderDto>> {
        Ok(self.db.list_order_views(OrderFilter::User(user_id)).await?)
    }

    /// Audit writes never fail the operation that triggered them
    async fn audit(&self, user_id: Option<i64>, action: &str, details: String) {
        if let Err(e) = self
            .db
            .append_audit(user_id, action, &details, now_millis())
            .await
        {
            tracing::warn!(error = %e, action, "Failed to write audit entry");
        }
    }
}
