//! A `ProductStore` kept in process memory, for tests that have no PostgreSQL.

use crate::store::{ProductPage, ProductStore};
use crate::DbError;
use async_trait::async_trait;
use chrono::Utc;
use core_types::{Product, ProductChanges, ProductDraft, ProductQuery};
use std::sync::{Mutex, MutexGuard};

const ARTICLE_NO_KEY: &str = "products_article_no_key";

#[derive(Debug, Default)]
struct Table {
    rows: Vec<Product>,
    next_id: i32,
    unavailable: bool,
}

/// Mirrors the behaviour of `DbRepository`: unique article numbers,
/// case-insensitive substring filters, newest-first ordering.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    table: Mutex<Table>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following call fail the way a lost database connection does.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.lock().unavailable = unavailable;
    }

    pub fn len(&self) -> usize {
        self.lock().rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, Table> {
        self.table.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn available(&self) -> Result<MutexGuard<'_, Table>, DbError> {
        let table = self.lock();
        if table.unavailable {
            return Err(DbError::QueryError(sqlx::Error::PoolTimedOut));
        }
        Ok(table)
    }
}

fn contains_ignore_case(haystack: &str, needle: Option<&str>) -> bool {
    needle.is_none_or(|n| haystack.to_lowercase().contains(&n.to_lowercase()))
}

fn article_taken(rows: &[Product], article_no: &str, except: Option<i32>) -> bool {
    rows.iter()
        .any(|p| p.article_no == article_no && Some(p.id) != except)
}

#[async_trait]
impl ProductStore for InMemoryStore {
    async fn list(&self, query: &ProductQuery) -> Result<ProductPage, DbError> {
        let table = self.available()?;
        let mut matching: Vec<&Product> = table
            .rows
            .iter()
            .filter(|p| contains_ignore_case(&p.article_no, query.article_filter()))
            .filter(|p| contains_ignore_case(&p.product_service, query.product_filter()))
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let total = matching.len() as i64;
        let products = matching
            .into_iter()
            .skip(query.offset() as usize)
            .take(query.limit() as usize)
            .cloned()
            .collect();
        Ok(ProductPage { products, total })
    }

    async fn get(&self, id: i32) -> Result<Product, DbError> {
        let table = self.available()?;
        table
            .rows
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or(DbError::NotFound)
    }

    async fn create(&self, draft: ProductDraft) -> Result<Product, DbError> {
        let mut table = self.available()?;
        if article_taken(&table.rows, &draft.article_no, None) {
            return Err(DbError::UniqueViolation(ARTICLE_NO_KEY.to_string()));
        }
        table.next_id += 1;
        let product = draft.into_product(table.next_id, Utc::now());
        table.rows.push(product.clone());
        Ok(product)
    }

    async fn update(&self, id: i32, changes: ProductChanges) -> Result<Product, DbError> {
        let mut table = self.available()?;
        // A missing row is reported before a taken article number.
        let index = table
            .rows
            .iter()
            .position(|p| p.id == id)
            .ok_or(DbError::NotFound)?;
        if let Some(article_no) = &changes.article_no {
            if article_taken(&table.rows, article_no, Some(id)) {
                return Err(DbError::UniqueViolation(ARTICLE_NO_KEY.to_string()));
            }
        }
        let product = &mut table.rows[index];
        if !changes.is_empty() {
            product.apply(&changes);
            product.updated_at = Utc::now();
        }
        Ok(product.clone())
    }

    async fn delete(&self, id: i32) -> Result<(), DbError> {
        let mut table = self.available()?;
        let before = table.rows.len();
        table.rows.retain(|p| p.id != id);
        if table.rows.len() == before {
            return Err(DbError::NotFound);
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), DbError> {
        self.available().map(|_| ())
    }
}
