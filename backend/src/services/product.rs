//! Product catalog service

use crate::error::{Resource, ServiceError};
use crate::repositories::ProductRepository;
use chrono::Utc;
use std::sync::Arc;
use storefront_shared::validation::ValidateRequest;
use storefront_shared::{CreateProductRequest, Product, UpdateProductRequest};
use tracing::info;
use uuid::Uuid;

#[derive(Clone)]
pub struct ProductService {
    products: Arc<dyn ProductRepository>,
}

impl ProductService {
    pub fn new(products: Arc<dyn ProductRepository>) -> Self {
        Self { products }
    }

    pub async fn list(&self) -> Result<Vec<Product>, ServiceError> {
        self.products
            .list()
            .await
            .map_err(ServiceError::from_store(Resource::Product))
    }

    pub async fn get(&self, id: Uuid) -> Result<Product, ServiceError> {
        self.products
            .find_by_id(id)
            .await
            .map_err(ServiceError::from_store(Resource::Product))
    }

    pub async fn create(&self, request: CreateProductRequest) -> Result<Product, ServiceError> {
        request.validate().map_err(ServiceError::Validation)?;

        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4(),
            name: request.name,
            description: request.description,
            price: request.price,
            stock: request.stock,
            category_id: request.category_id,
            image_url: request.image_url,
            created_at: now,
            updated_at: now,
        };

        self.products
            .create(&product)
            .await
            .map_err(ServiceError::from_store(Resource::Product))?;

        info!(product_id = %product.id, "Product created");
        Ok(product)
    }

    /// Apply the present fields of `request`; absent ones are left alone
    pub async fn update(
        &self,
        id: Uuid,
        request: UpdateProductRequest,
    ) -> Result<Product, ServiceError> {
        request.validate().map_err(ServiceError::Validation)?;

        let mut product = self.get(id).await?;

        if let Some(name) = request.name {
            product.name = name;
        }
        if let Some(description) = request.description {
            product.description = description;
        }
        if let Some(price) = request.price {
            product.price = price;
        }
        if let Some(stock) = request.stock {
            product.stock = stock;
        }
        if let Some(category_id) = request.category_id {
            product.category_id = category_id;
        }
        if request.image_url.is_some() {
            product.image_url = request.image_url;
        }
        product.updated_at = Utc::now();

        self.products
            .update(&product)
            .await
            .map_err(ServiceError::from_store(Resource::Product))?;

        Ok(product)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        self.products
            .delete(id)
            .await
            .map_err(ServiceError::from_store(Resource::Product))?;

        info!(product_id = %id, "Product deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::InMemoryProductRepository;
    use rust_decimal::Decimal;

    fn service() -> ProductService {
        ProductService::new(Arc::new(InMemoryProductRepository::new()))
    }

    fn lamp() -> CreateProductRequest {
        CreateProductRequest {
            name: "Desk lamp".to_string(),
            description: "Warm light".to_string(),
            price: Decimal::new(2499, 2),
            stock: 10,
            category_id: "lighting".to_string(),
            image_url: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let catalog = service();
        let created = catalog.create(lamp()).await.unwrap();

        let fetched = catalog.get(created.id).await.unwrap();
        assert_eq!(fetched.name, "Desk lamp");
        assert_eq!(fetched.price, Decimal::new(2499, 2));
        assert_eq!(catalog.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_rejects_non_positive_price() {
        let catalog = service();
        let result = catalog
            .create(CreateProductRequest {
                price: Decimal::ZERO,
                ..lamp()
            })
            .await;

        let Err(ServiceError::Validation(errors)) = result else {
            panic!("expected validation error");
        };
        assert_eq!(errors[0].field, "price");
    }

    #[tokio::test]
    async fn test_partial_update_keeps_other_fields() {
        let catalog = service();
        let created = catalog.create(lamp()).await.unwrap();

        let updated = catalog
            .update(
                created.id,
                UpdateProductRequest {
                    stock: Some(0),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.stock, 0);
        assert_eq!(updated.name, created.name);
        assert_eq!(updated.price, created.price);
        assert!(updated.updated_at >= created.updated_at);
    }

    #[tokio::test]
    async fn test_missing_product_is_not_found() {
        let catalog = service();
        let id = Uuid::new_v4();

        assert!(matches!(
            catalog.get(id).await,
            Err(ServiceError::NotFound(Resource::Product))
        ));
        assert!(matches!(
            catalog.update(id, UpdateProductRequest::default()).await,
            Err(ServiceError::NotFound(Resource::Product))
        ));
        assert!(matches!(
            catalog.delete(id).await,
            Err(ServiceError::NotFound(Resource::Product))
        ));
    }
}
