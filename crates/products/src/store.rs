use async_trait::async_trait;

use marketplace_core::{DomainResult, Pagination, ProductId, UserId};

use crate::{NewProduct, Product, ProductChanges, ProductFilter};

/// Persistence port for products.
///
/// Soft-deleted rows are invisible to every method. Code uniqueness among
/// active products is enforced atomically and reported as `Conflict`.
#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn insert(&self, product: NewProduct) -> DomainResult<Product>;

    async fn get_by_id(&self, id: ProductId) -> DomainResult<Option<Product>>;

    async fn get_by_code(&self, code: &str) -> DomainResult<Option<Product>>;

    async fn list(&self, filter: &ProductFilter, pagination: Pagination) -> DomainResult<(Vec<Product>, u64)>;

    async fn count_by_owner(&self, user_id: UserId) -> DomainResult<u64>;

    async fn update(&self, id: ProductId, changes: &ProductChanges) -> DomainResult<Option<Product>>;

    async fn soft_delete(&self, id: ProductId) -> DomainResult<bool>;

    async fn ping(&self) -> DomainResult<()>;
}
