use std::sync::Arc;

use tracing::{debug, info, instrument};

use marketplace_core::{DomainError, DomainResult, PageRequest, Paginated, PaginationConfig, ProductId};
use marketplace_users::UserStore;

use crate::{BusinessRules, NewProduct, Product, ProductChanges, ProductFilter, ProductStore};

#[derive(Clone)]
pub struct ProductService {
    products: Arc<dyn ProductStore>,
    users: Arc<dyn UserStore>,
    pagination: PaginationConfig,
    rules: BusinessRules,
}

impl ProductService {
    pub fn new(
        products: Arc<dyn ProductStore>,
        users: Arc<dyn UserStore>,
        pagination: PaginationConfig,
        rules: BusinessRules,
    ) -> Self {
        Self {
            products,
            users,
            pagination,
            rules,
        }
    }

    pub fn store(&self) -> &Arc<dyn ProductStore> {
        &self.products
    }

    /// Create a product for an existing owner.
    ///
    /// Order of checks: shape, owner exists, owner quota, code uniqueness.
    /// The quota is not backstopped by the store, so concurrent creates for one
    /// owner can overshoot it.
    #[instrument(skip(self, new_product), fields(code = %new_product.code, user_id = %new_product.user_id), err(Display))]
    pub async fn create_product(&self, mut new_product: NewProduct) -> DomainResult<Product> {
        self.rules.validate_new(&new_product)?;

        if self.users.get_by_id(new_product.user_id).await?.is_none() {
            return Err(DomainError::not_found("user"));
        }

        let owned = self.products.count_by_owner(new_product.user_id).await?;
        if self.rules.quota_reached(owned) {
            debug!(owned, max = self.rules.max_products_per_user, "product quota reached");
            return Err(DomainError::quota_exceeded(format!(
                "user already has {owned} products (max {})",
                self.rules.max_products_per_user
            )));
        }

        if self.products.get_by_code(&new_product.code).await?.is_some() {
            return Err(DomainError::conflict("product code already exists"));
        }

        new_product.status = self.rules.resolve_status(&new_product.status);

        let product = self.products.insert(new_product).await?;
        info!(product_id = %product.id, "product created");
        Ok(product)
    }

    #[instrument(skip(self), err(Display))]
    pub async fn get_product(&self, id: ProductId) -> DomainResult<Product> {
        self.products
            .get_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("product"))
    }

    #[instrument(skip(self), err(Display))]
    pub async fn get_product_by_code(&self, code: &str) -> DomainResult<Product> {
        self.products
            .get_by_code(code)
            .await?
            .ok_or_else(|| DomainError::not_found("product"))
    }

    #[instrument(skip(self), err(Display))]
    pub async fn list_products(
        &self,
        filter: Option<ProductFilter>,
        page: Option<PageRequest>,
    ) -> DomainResult<Paginated<Product>> {
        let pagination = self.pagination.normalize(page);
        let filter = filter.unwrap_or_default();
        let (rows, total) = self.products.list(&filter, pagination).await?;
        Ok(Paginated::new(rows, pagination, total))
    }

    #[instrument(skip(self, changes), err(Display))]
    pub async fn update_product(&self, id: ProductId, changes: ProductChanges) -> DomainResult<Product> {
        self.get_product(id).await?;

        if let Some(code) = &changes.code {
            if let Some(existing) = self.products.get_by_code(code).await? {
                if existing.id != id {
                    return Err(DomainError::conflict("product code already exists"));
                }
            }
        }
        self.rules.validate_changes(&changes)?;

        let product = self
            .products
            .update(id, &changes)
            .await?
            .ok_or_else(|| DomainError::not_found("product"))?;
        info!(product_id = %product.id, "product updated");
        Ok(product)
    }

    #[instrument(skip(self), err(Display))]
    pub async fn delete_product(&self, id: ProductId) -> DomainResult<()> {
        self.get_product(id).await?;
        if !self.products.soft_delete(id).await? {
            return Err(DomainError::not_found("product"));
        }
        info!(product_id = %id, "product deleted");
        Ok(())
    }
}
