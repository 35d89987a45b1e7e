use async_trait::async_trait;
use shared::models::{Category, CategoryCreate, CategoryUpdate, Product, ProductCreate, ProductUpdate};

use super::PgStore;
use crate::db::{CatalogStore, RepoResult};

const PRODUCT_SELECT: &str = "SELECT p.id, p.category_id, p.name, p.description, p.price, p.unit,
        p.image_url, p.is_active, p.stock, c.name AS category_name
     FROM products p
     LEFT JOIN categories c ON c.id = p.category_id";

#[async_trait]
impl CatalogStore for PgStore {
    async fn list_products(&self) -> RepoResult<Vec<Product>> {
        let rows = sqlx::query_as(&format!("{PRODUCT_SELECT} ORDER BY p.id"))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn find_product(&self, id: i64) -> RepoResult<Option<Product>> {
        let row = sqlx::query_as(&format!("{PRODUCT_SELECT} WHERE p.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn insert_product(&self, data: ProductCreate) -> RepoResult<Product> {
        let (id,): (i64,) = sqlx::query_as(
            "INSERT INTO products
                (category_id, name, description, price, unit, image_url, is_active, stock)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING id",
        )
        .bind(data.category_id)
        .bind(&data.name)
        .bind(&data.description)
        .bind(data.price)
        .bind(&data.unit)
        .bind(&data.image_url)
        .bind(data.is_active)
        .bind(data.stock)
        .fetch_one(&self.pool)
        .await?;

        let row = sqlx::query_as(&format!("{PRODUCT_SELECT} WHERE p.id = $1"))
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    async fn update_product(&self, id: i64, data: ProductUpdate) -> RepoResult<Option<Product>> {
        let result = sqlx::query(
            "UPDATE products SET
                category_id = COALESCE($2, category_id),
                name = COALESCE($3, name),
                description = COALESCE($4, description),
                price = COALESCE($5, price),
                unit = COALESCE($6, unit),
                image_url = COALESCE($7, image_url),
                is_active = COALESCE($8, is_active)
             WHERE id = $1",
        )
        .bind(id)
        .bind(data.category_id)
        .bind(&data.name)
        .bind(&data.description)
        .bind(data.price)
        .bind(&data.unit)
        .bind(&data.image_url)
        .bind(data.is_active)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.find_product(id).await
    }

    async fn deactivate_product(&self, id: i64) -> RepoResult<bool> {
        let result = sqlx::query("UPDATE products SET is_active = FALSE WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_product_stock(&self, id: i64, stock: Option<i32>) -> RepoResult<Option<Product>> {
        let result = sqlx::query("UPDATE products SET stock = $2 WHERE id = $1")
            .bind(id)
            .bind(stock)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.find_product(id).await
    }

    async fn list_categories(&self) -> RepoResult<Vec<Category>> {
        let rows = sqlx::query_as("SELECT id, name, description FROM categories ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn find_category(&self, id: i64) -> RepoResult<Option<Category>> {
        let row = sqlx::query_as("SELECT id, name, description FROM categories WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn insert_category(&self, data: CategoryCreate) -> RepoResult<Category> {
        let row = sqlx::query_as(
            "INSERT INTO categories (name, description) VALUES ($1, $2)
             RETURNING id, name, description",
        )
        .bind(&data.name)
        .bind(&data.description)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn update_category(
        &self,
        id: i64,
        data: CategoryUpdate,
    ) -> RepoResult<Option<Category>> {
        let row = sqlx::query_as(
            "UPDATE categories SET name = $2, description = $3 WHERE id = $1
             RETURNING id, name, description",
        )
        .bind(id)
        .bind(&data.name)
        .bind(&data.description)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn delete_category(&self, id: i64) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
