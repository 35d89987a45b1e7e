use std::collections::HashMap;

use async_trait::async_trait;
use rust_decimal::Decimal;
use shared::models::{OrderDto, OrderItemDto, OrderStatus, Product};
use sqlx::{Postgres, Transaction};

use super::PgStore;
use crate::db::{
    NewOrder, OrderFilter, OrderItem, OrderRecord, OrderStore, OrderTx, RepoError, RepoResult,
};

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: i64,
    institution_id: i64,
    user_id: i64,
    total_amount: Decimal,
    status: String,
    created_at: i64,
}

#[derive(sqlx::FromRow)]
struct OrderItemRow {
    product_id: i64,
    quantity: i32,
    price: Decimal,
}

#[derive(sqlx::FromRow)]
struct OrderHeadRow {
    id: i64,
    institution_id: i64,
    institution_name: String,
    user_id: i64,
    user_full_name: String,
    total_amount: Decimal,
    status: String,
    created_at: i64,
}

#[derive(sqlx::FromRow)]
struct OrderLineRow {
    order_id: i64,
    product_id: i64,
    product_name: String,
    price: Decimal,
    quantity: i32,
    unit: Option<String>,
    image_url: Option<String>,
}

fn parse_status(s: &str) -> RepoResult<OrderStatus> {
    OrderStatus::from_db(s).ok_or_else(|| RepoError::Database(format!("unknown order status '{s}'")))
}

fn into_record(row: OrderRow, items: Vec<OrderItemRow>) -> RepoResult<OrderRecord> {
    Ok(OrderRecord {
        id: row.id,
        institution_id: row.institution_id,
        user_id: row.user_id,
        total_amount: row.total_amount,
        status: parse_status(&row.status)?,
        created_at: row.created_at,
        items: items
            .into_iter()
            .map(|i| OrderItem {
                product_id: i.product_id,
                quantity: i.quantity,
                price: i.price,
            })
            .collect(),
    })
}

const ORDER_HEAD_SELECT: &str = "SELECT o.id, o.institution_id, i.name AS institution_name,
        o.user_id, u.full_name AS user_full_name, o.total_amount, o.status, o.created_at
     FROM orders o
     JOIN institutions i ON i.id = o.institution_id
     JOIN users u ON u.id = o.user_id";

impl PgStore {
    /// Attach display lines to order heads, keeping the heads' order
    async fn materialize(&self, heads: Vec<OrderHeadRow>) -> RepoResult<Vec<OrderDto>> {
        if heads.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i64> = heads.iter().map(|h| h.id).collect();

        let lines: Vec<OrderLineRow> = sqlx::query_as(
            "SELECT oi.order_id, oi.product_id, p.name AS product_name, oi.price, oi.quantity,
                    p.unit, p.image_url
             FROM order_items oi
             JOIN products p ON p.id = oi.product_id
             WHERE oi.order_id = ANY($1)
             ORDER BY oi.order_id, oi.id",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_order: HashMap<i64, Vec<OrderItemDto>> = HashMap::new();
        for line in lines {
            by_order.entry(line.order_id).or_default().push(OrderItemDto {
                product_id: line.product_id,
                product_name: line.product_name,
                price: line.price,
                quantity: line.quantity,
                unit: line.unit,
                image_url: line.image_url,
            });
        }

        heads
            .into_iter()
            .map(|h| {
                Ok(OrderDto {
                    items: by_order.remove(&h.id).unwrap_or_default(),
                    status: parse_status(&h.status)?,
                    id: h.id,
                    institution_id: h.institution_id,
                    institution_name: h.institution_name,
                    user_id: h.user_id,
                    user_full_name: h.user_full_name,
                    created_at: h.created_at,
                    total_amount: h.total_amount,
                })
            })
            .collect()
    }
}

#[async_trait]
impl OrderStore for PgStore {
    async fn begin_order_tx(&self) -> RepoResult<Box<dyn OrderTx>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgOrderTx { tx }))
    }

    async fn find_order(&self, id: i64) -> RepoResult<Option<OrderRecord>> {
        let row: Option<OrderRow> = sqlx::query_as(
            "SELECT id, institution_id, user_id, total_amount, status, created_at
             FROM orders WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        let Some(row) = row else {
            return Ok(None);
        };

        let items: Vec<OrderItemRow> = sqlx::query_as(
            "SELECT product_id, quantity, price FROM order_items WHERE order_id = $1 ORDER BY id",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;
        into_record(row, items).map(Some)
    }

    async fn order_view(&self, id: i64) -> RepoResult<Option<OrderDto>> {
        let heads: Vec<OrderHeadRow> =
            sqlx::query_as(&format!("{ORDER_HEAD_SELECT} WHERE o.id = $1"))
                .bind(id)
                .fetch_all(&self.pool)
                .await?;
        Ok(self.materialize(heads).await?.into_iter().next())
    }

    async fn list_order_views(&self, filter: OrderFilter) -> RepoResult<Vec<OrderDto>> {
        let (institution_id, user_id) = match filter {
            OrderFilter::All => (None, None),
            OrderFilter::Institution(id) => (Some(id), None),
            OrderFilter::User(id) => (None, Some(id)),
        };
        let heads: Vec<OrderHeadRow> = sqlx::query_as(&format!(
            "{ORDER_HEAD_SELECT}
             WHERE ($1::BIGINT IS NULL OR o.institution_id = $1)
               AND ($2::BIGINT IS NULL OR o.user_id = $2)
             ORDER BY o.created_at DESC, o.id DESC"
        ))
        .bind(institution_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        self.materialize(heads).await
    }
}

/// Order unit of work on one PostgreSQL transaction
struct PgOrderTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl OrderTx for PgOrderTx {
    async fn institution_exists(&mut self, id: i64) -> RepoResult<bool> {
        let found: Option<(i64,)> = sqlx::query_as("SELECT id FROM institutions WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(found.is_some())
    }

    async fn user_exists(&mut self, id: i64) -> RepoResult<bool> {
        let found: Option<(i64,)> = sqlx::query_as("SELECT id FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(found.is_some())
    }

    async fn lock_products(&mut self, ids: &[i64]) -> RepoResult<Vec<Product>> {
        // Locks are taken in id order so concurrent orders cannot deadlock.
        let rows = sqlx::query_as(
            "SELECT id, category_id, name, description, price, unit, image_url, is_active, stock
             FROM products
             WHERE id = ANY($1)
             ORDER BY id
             FOR UPDATE",
        )
        .bind(ids)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(rows)
    }

    async fn write_stock(&mut self, product_id: i64, stock: i32) -> RepoResult<()> {
        let result = sqlx::query("UPDATE products SET stock = $2 WHERE id = $1")
            .bind(product_id)
            .bind(stock)
            .execute(&mut *self.tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn insert_order(&mut self, order: NewOrder) -> RepoResult<i64> {
        let (order_id,): (i64,) = sqlx::query_as(
            "INSERT INTO orders (institution_id, user_id, total_amount, status, created_at)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING id",
        )
        .bind(order.institution_id)
        .bind(order.user_id)
        .bind(order.total_amount)
        .bind(order.status.as_db())
        .bind(order.created_at)
        .fetch_one(&mut *self.tx)
        .await?;

        let product_ids: Vec<i64> = order.items.iter().map(|i| i.product_id).collect();
        let quantities: Vec<i32> = order.items.iter().map(|i| i.quantity).collect();
        let prices: Vec<Decimal> = order.items.iter().map(|i| i.price).collect();

        sqlx::query(
            "INSERT INTO order_items (order_id, product_id, quantity, price)
             SELECT $1, * FROM UNNEST($2::BIGINT[], $3::INTEGER[], $4::NUMERIC[])",
        )
        .bind(order_id)
        .bind(&product_ids)
        .bind(&quantities)
        .bind(&prices)
        .execute(&mut *self.tx)
        .await?;

        Ok(order_id)
    }

    async fn lock_order(&mut self, id: i64) -> RepoResult<Option<OrderRecord>> {
        let row: Option<OrderRow> = sqlx::query_as(
            "SELECT id, institution_id, user_id, total_amount, status, created_at
             FROM orders WHERE id = $1
             FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;
        let Some(row) = row else {
            return Ok(None);
        };

        let items: Vec<OrderItemRow> = sqlx::query_as(
            "SELECT product_id, quantity, price FROM order_items WHERE order_id = $1 ORDER BY id",
        )
        .bind(id)
        .fetch_all(&mut *self.tx)
        .await?;
        into_record(row, items).map(Some)
    }

    async fn write_order_status(&mut self, id: i64, status: OrderStatus) -> RepoResult<()> {
        sqlx::query("UPDATE orders SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(status.as_db())
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> RepoResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
