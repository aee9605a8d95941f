//! # Price List Database Crate
//!
//! The persistence layer of the price list: a single `products` table in
//! PostgreSQL, reached through `sqlx`.
//!
//! ## Public API
//!
//! - `connect`: Establishes the connection pool from `DatabaseSettings`.
//! - `run_migrations`: Applies the embedded migrations in `./migrations`.
//! - `ProductStore`: The data access contract the web server is written against.
//! - `DbRepository`: The PostgreSQL implementation of `ProductStore`.
//! - `InMemoryStore`: A process-local implementation for tests
//!   (behind the `test-util` feature).
//! - `DbError`: The specific error types that can be returned from this crate.

pub mod connection;
pub mod error;
#[cfg(any(test, feature = "test-util"))]
pub mod memory;
pub mod repository;
pub mod store;

pub use connection::{connect, run_migrations, MIGRATOR};
pub use error::DbError;
#[cfg(any(test, feature = "test-util"))]
pub use memory::InMemoryStore;
pub use repository::DbRepository;
pub use store::{ProductPage, ProductStore};
