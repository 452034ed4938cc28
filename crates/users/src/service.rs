use std::sync::Arc;

use tracing::{debug, info, instrument};

use marketplace_core::{DomainError, DomainResult, PageRequest, Paginated, PaginationConfig, UserId};

use crate::{NewUser, User, UserChanges, UserFilter, UserStore, ValidationConfig};

/// Business rules around user accounts.
#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn UserStore>,
    pagination: PaginationConfig,
    validation: ValidationConfig,
}

impl UserService {
    pub fn new(store: Arc<dyn UserStore>, pagination: PaginationConfig, validation: ValidationConfig) -> Self {
        Self {
            store,
            pagination,
            validation,
        }
    }

    pub fn validation(&self) -> &ValidationConfig {
        &self.validation
    }

    pub fn store(&self) -> &Arc<dyn UserStore> {
        &self.store
    }

    #[instrument(skip(self, new_user), fields(email = %new_user.email), err(Display))]
    pub async fn create_user(&self, new_user: NewUser) -> DomainResult<User> {
        self.validation.validate_email(&new_user.email)?;
        self.validation.validate_name(&new_user.name)?;

        if self.store.get_by_email(&new_user.email).await?.is_some() {
            debug!("email already registered");
            return Err(DomainError::conflict("email already exists"));
        }

        let user = self.store.insert(new_user).await?;
        info!(user_id = %user.id, "user created");
        Ok(user)
    }

    #[instrument(skip(self), err(Display))]
    pub async fn get_user(&self, id: UserId) -> DomainResult<User> {
        self.store
            .get_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("user"))
    }

    #[instrument(skip(self), err(Display))]
    pub async fn get_user_by_email(&self, email: &str) -> DomainResult<User> {
        self.store
            .get_by_email(email)
            .await?
            .ok_or_else(|| DomainError::not_found("user"))
    }

    #[instrument(skip(self), err(Display))]
    pub async fn list_users(
        &self,
        filter: Option<UserFilter>,
        page: Option<PageRequest>,
    ) -> DomainResult<Paginated<User>> {
        let pagination = self.pagination.normalize(page);
        let filter = filter.unwrap_or_default();
        let (rows, total) = self.store.list(&filter, pagination).await?;
        Ok(Paginated::new(rows, pagination, total))
    }

    #[instrument(skip(self, changes), err(Display))]
    pub async fn update_user(&self, id: UserId, changes: UserChanges) -> DomainResult<User> {
        let current = self.get_user(id).await?;
        if changes.is_empty() {
            return Ok(current);
        }

        if let Some(email) = &changes.email {
            self.validation.validate_email(email)?;
            if let Some(existing) = self.store.get_by_email(email).await? {
                if existing.id != id {
                    return Err(DomainError::conflict("email already exists"));
                }
            }
        }
        if let Some(name) = &changes.name {
            self.validation.validate_name(name)?;
        }

        let user = self
            .store
            .update(id, &changes)
            .await?
            .ok_or_else(|| DomainError::not_found("user"))?;
        info!(user_id = %user.id, "user updated");
        Ok(user)
    }

    /// Soft delete. The user's products are left untouched.
    #[instrument(skip(self), err(Display))]
    pub async fn delete_user(&self, id: UserId) -> DomainResult<()> {
        if !self.store.soft_delete(id).await? {
            return Err(DomainError::not_found("user"));
        }
        info!(user_id = %id, "user deleted");
        Ok(())
    }
}
