use crate::error::DbError;
use async_trait::async_trait;
use core_types::{Product, ProductChanges, ProductDraft, ProductQuery};

/// One page of products plus the number of rows matching the filters.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub total: i64,
}

/// The data access contract of the `products` table.
///
/// The web server only talks to this trait, so the PostgreSQL repository can
/// be swapped for an in-memory one in tests.
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Filters, orders (newest first) and paginates.
    async fn list(&self, query: &ProductQuery) -> Result<ProductPage, DbError>;

    /// Fails with `DbError::NotFound` for an unknown id.
    async fn get(&self, id: i32) -> Result<Product, DbError>;

    /// Fails with `DbError::UniqueViolation` when the article number is taken.
    async fn create(&self, draft: ProductDraft) -> Result<Product, DbError>;

    /// Applies `changes` and bumps `updated_at`. Empty changes return the row untouched.
    async fn update(&self, id: i32, changes: ProductChanges) -> Result<Product, DbError>;

    async fn delete(&self, id: i32) -> Result<(), DbError>;

    /// Round-trips to the database without touching any table.
    async fn ping(&self) -> Result<(), DbError>;
}
