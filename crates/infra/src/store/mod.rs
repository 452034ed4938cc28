//! Store adapters for the users and products ports.
//!
//! - `in_memory`: lock-guarded maps for tests and database-less development
//! - `postgres`: `sqlx` over a `PgPool`, with an idempotent schema bootstrap

pub mod in_memory;
pub mod postgres;

pub use in_memory::{InMemoryProductStore, InMemoryUserStore};
pub use marketplace_products::ProductStore;
pub use marketplace_users::UserStore;
pub use postgres::{PostgresProductStore, PostgresUserStore, connect, ensure_schema};
