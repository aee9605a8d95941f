use core_types::{BulkUpdateItem, Product};
use serde::Serialize;

/// One page of `GET /products`.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductList {
    pub products: Vec<Product>,
    /// Number of rows matching the filters, across all pages.
    pub total: i64,
    pub limit: u32,
    pub offset: u32,
}

/// Body of `PATCH /products/bulk`.
#[derive(Debug, Serialize)]
pub(crate) struct BulkUpdateRequest<'a> {
    pub updates: &'a [BulkUpdateItem],
}
