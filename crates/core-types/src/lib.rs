//! # Price List Core Types
//!
//! The shared vocabulary of the workspace: the `Product` record, the request
//! bodies that create and modify it, the validation rules that guard the
//! `products` table, and the JSON envelope exchanged between the web server
//! and its clients.
//!
//! This crate has no I/O of its own. Both the server and the client depend on
//! it so that the wire format is defined exactly once.

pub mod enums;
pub mod envelope;
pub mod error;
pub mod structs;
pub mod validation;

// Re-export the core types to provide a clean public API.
pub use enums::ProductField;
pub use envelope::{BannerEndpoints, BulkItemResult, Envelope, HealthReport, ServiceBanner};
pub use error::CoreError;
pub use structs::{
    BulkUpdateItem, NewProduct, Product, ProductChanges, ProductDraft, ProductPatch, ProductQuery,
};
pub use validation::{FieldError, ValidationErrors};

/// Page size used by `GET /products` when the caller gives no `limit`.
pub const DEFAULT_PAGE_LIMIT: u32 = 50;

/// Unit assigned to products created without one.
pub const DEFAULT_UNIT: &str = "pieces";
