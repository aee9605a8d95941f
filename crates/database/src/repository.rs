use crate::store::{ProductPage, ProductStore};
use crate::DbError;
use async_trait::async_trait;
use core_types::{Product, ProductChanges, ProductDraft, ProductQuery};
use sqlx::postgres::{PgPool, Postgres};
use sqlx::QueryBuilder;

const PRODUCT_COLUMNS: &str = "id, article_no, product_service, in_price, price, unit, \
                               in_stock, description, created_at, updated_at";

/// The `DbRepository` provides a high-level, application-specific interface
/// to the database. It encapsulates all SQL queries and data access logic.
#[derive(Debug, Clone)]
pub struct DbRepository {
    pool: PgPool,
}

impl DbRepository {
    /// Creates a new `DbRepository` with a shared database connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Turns user text into a LIKE pattern that matches it literally anywhere.
pub(crate) fn contains_pattern(text: &str) -> String {
    let mut pattern = String::with_capacity(text.len() + 2);
    pattern.push('%');
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &ProductQuery) {
    let mut keyword = " WHERE ";
    if let Some(article) = query.article_filter() {
        builder
            .push(keyword)
            .push("article_no ILIKE ")
            .push_bind(contains_pattern(article));
        keyword = " AND ";
    }
    if let Some(product) = query.product_filter() {
        builder
            .push(keyword)
            .push("product_service ILIKE ")
            .push_bind(contains_pattern(product));
    }
}

#[async_trait]
impl ProductStore for DbRepository {
    #[tracing::instrument(skip(self))]
    async fn list(&self, query: &ProductQuery) -> Result<ProductPage, DbError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM products");
        push_filters(&mut count, query);

        let mut rows = QueryBuilder::<Postgres>::new(format!("SELECT {PRODUCT_COLUMNS} FROM products"));
        push_filters(&mut rows, query);
        rows.push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(i64::from(query.limit()))
            .push(" OFFSET ")
            .push_bind(i64::from(query.offset()));

        let (total, products) = tokio::join!(
            count.build_query_scalar::<i64>().fetch_one(&self.pool),
            rows.build_query_as::<Product>().fetch_all(&self.pool),
        );

        Ok(ProductPage {
            products: products?,
            total: total?,
        })
    }

    #[tracing::instrument(skip(self))]
    async fn get(&self, id: i32) -> Result<Product, DbError> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(product)
    }

    #[tracing::instrument(skip(self, draft), fields(article_no = %draft.article_no))]
    async fn create(&self, draft: ProductDraft) -> Result<Product, DbError> {
        let product = sqlx::query_as::<_, Product>(&format!(
            r#"
            INSERT INTO products (article_no, product_service, in_price, price, unit, in_stock, description)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(draft.article_no)
        .bind(draft.product_service)
        .bind(draft.in_price)
        .bind(draft.price)
        .bind(draft.unit)
        .bind(draft.in_stock)
        .bind(draft.description)
        .fetch_one(&self.pool)
        .await?;
        Ok(product)
    }

    #[tracing::instrument(skip(self, changes))]
    async fn update(&self, id: i32, changes: ProductChanges) -> Result<Product, DbError> {
        if changes.is_empty() {
            return self.get(id).await;
        }

        let mut builder = QueryBuilder::<Postgres>::new("UPDATE products SET ");
        let mut set = builder.separated(", ");
        if let Some(v) = changes.article_no {
            set.push("article_no = ").push_bind_unseparated(v);
        }
        if let Some(v) = changes.product_service {
            set.push("product_service = ").push_bind_unseparated(v);
        }
        if let Some(v) = changes.in_price {
            set.push("in_price = ").push_bind_unseparated(v);
        }
        if let Some(v) = changes.price {
            set.push("price = ").push_bind_unseparated(v);
        }
        if let Some(v) = changes.unit {
            set.push("unit = ").push_bind_unseparated(v);
        }
        if let Some(v) = changes.in_stock {
            set.push("in_stock = ").push_bind_unseparated(v);
        }
        if let Some(v) = changes.description {
            set.push("description = ").push_bind_unseparated(v);
        }
        set.push("updated_at = NOW()");

        builder
            .push(" WHERE id = ")
            .push_bind(id)
            .push(format!(" RETURNING {PRODUCT_COLUMNS}"));

        builder
            .build_query_as::<Product>()
            .fetch_optional(&self.pool)
            .await?
            .ok_or(DbError::NotFound)
    }

    #[tracing::instrument(skip(self))]
    async fn delete(&self, id: i32) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn ping(&self) -> Result<(), DbError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
