//! Products domain module.
//!
//! Catalog entries owned by users. Business rules (shape, ownership, per-owner
//! quota, code uniqueness) live in [`ProductService`]; storage is behind
//! [`ProductStore`].

pub mod product;
pub mod rules;
pub mod service;
pub mod store;

pub use product::{NewProduct, Product, ProductChanges, ProductFilter};
pub use rules::BusinessRules;
pub use service::ProductService;
pub use store::ProductStore;
