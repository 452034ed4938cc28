use async_trait::async_trait;

use marketplace_core::{DomainResult, Pagination, UserId};

use crate::{NewUser, User, UserChanges, UserFilter};

/// Persistence port for users.
///
/// Every read ignores soft-deleted rows. Implementations enforce email
/// uniqueness among active users atomically and report it as `Conflict`.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert(&self, user: NewUser) -> DomainResult<User>;

    async fn get_by_id(&self, id: UserId) -> DomainResult<Option<User>>;

    async fn get_by_email(&self, email: &str) -> DomainResult<Option<User>>;

    /// One page of matching users ordered by id, plus the total match count.
    async fn list(&self, filter: &UserFilter, pagination: Pagination) -> DomainResult<(Vec<User>, u64)>;

    /// Returns `None` when no active user has this id.
    async fn update(&self, id: UserId, changes: &UserChanges) -> DomainResult<Option<User>>;

    /// Returns `false` when no active user has this id.
    async fn soft_delete(&self, id: UserId) -> DomainResult<bool>;

    /// Liveness check for `/health`.
    async fn ping(&self) -> DomainResult<()>;
}
