//! Product repository

use super::RepositoryError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use std::collections::HashMap;
use storefront_shared::Product;
use tokio::sync::RwLock;
use uuid::Uuid;

#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn create(&self, product: &Product) -> Result<(), RepositoryError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Product, RepositoryError>;
    /// All products, newest first
    async fn list(&self) -> Result<Vec<Product>, RepositoryError>;
    async fn update(&self, product: &Product) -> Result<(), RepositoryError>;
    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError>;
}

#[derive(Default)]
pub struct InMemoryProductRepository {
    products: RwLock<HashMap<Uuid, Product>>,
}

impl InMemoryProductRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProductRepository for InMemoryProductRepository {
    async fn create(&self, product: &Product) -> Result<(), RepositoryError> {
        let mut products = self.products.write().await;
        if products.contains_key(&product.id) {
            return Err(RepositoryError::Duplicate);
        }
        products.insert(product.id, product.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Product, RepositoryError> {
        self.products
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn list(&self) -> Result<Vec<Product>, RepositoryError> {
        let mut products: Vec<Product> = self.products.read().await.values().cloned().collect();
        products.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(products)
    }

    async fn update(&self, product: &Product) -> Result<(), RepositoryError> {
        let mut products = self.products.write().await;
        match products.get_mut(&product.id) {
            Some(existing) => {
                *existing = product.clone();
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError> {
        self.products
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct ProductRecord {
    id: Uuid,
    name: String,
    description: String,
    price: Decimal,
    stock: i32,
    category_id: String,
    image_url: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRecord> for Product {
    fn from(r: ProductRecord) -> Self {
        Product {
            id: r.id,
            name: r.name,
            description: r.description,
            price: r.price,
            stock: r.stock,
            category_id: r.category_id,
            image_url: r.image_url,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(Clone)]
pub struct PgProductRepository {
    pool: PgPool,
}

impl PgProductRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProductRepository for PgProductRepository {
    async fn create(&self, product: &Product) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO products
                (id, name, description, price, stock, category_id, image_url, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(product.id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .bind(product.stock)
        .bind(&product.category_id)
        .bind(&product.image_url)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Product, RepositoryError> {
        let record = sqlx::query_as::<_, ProductRecord>(
            r#"
            SELECT id, name, description, price, stock, category_id, image_url, created_at, updated_at
            FROM products
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(record.into())
    }

    async fn list(&self) -> Result<Vec<Product>, RepositoryError> {
        let records = sqlx::query_as::<_, ProductRecord>(
            r#"
            SELECT id, name, description, price, stock, category_id, image_url, created_at, updated_at
            FROM products
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(records.into_iter().map(Product::from).collect())
    }

    async fn update(&self, product: &Product) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET name = $2, description = $3, price = $4, stock = $5,
                category_id = $6, image_url = $7, updated_at = $8
            WHERE id = $1
            "#,
        )
        .bind(product.id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .bind(product.stock)
        .bind(&product.category_id)
        .bind(&product.image_url)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
