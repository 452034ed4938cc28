use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::Utc;

use marketplace_core::{DomainError, DomainResult, Entity, Pagination, ProductId, UserId};
use marketplace_products::{NewProduct, Product, ProductChanges, ProductFilter, ProductStore};
use marketplace_users::{NewUser, User, UserChanges, UserFilter, UserStore};

fn poisoned() -> DomainError {
    DomainError::internal("lock poisoned")
}

/// Sort by id, then cut one page out of the matches.
fn paginate<T: Entity>(mut rows: Vec<T>, pagination: Pagination) -> (Vec<T>, u64)
where
    T::Id: Ord,
{
    rows.sort_by_key(|r| r.id());
    let total = rows.len() as u64;
    let offset = usize::try_from(pagination.offset()).unwrap_or(usize::MAX);
    let limit = usize::try_from(pagination.limit()).unwrap_or(usize::MAX);
    let page = rows.into_iter().skip(offset).take(limit).collect();
    (page, total)
}

#[derive(Debug)]
struct Table<T> {
    rows: HashMap<i64, T>,
    next_id: i64,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            rows: HashMap::new(),
            next_id: 0,
        }
    }
}

impl<T> Table<T> {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// In-memory user store.
///
/// Intended for tests/dev. Email uniqueness is checked under the write lock.
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    table: RwLock<Table<User>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn active(&self, id: UserId) -> DomainResult<Option<User>> {
        let table = self.table.read().map_err(|_| poisoned())?;
        Ok(table.rows.get(&id.get()).filter(|u| u.is_active()).cloned())
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn insert(&self, user: NewUser) -> DomainResult<User> {
        let mut table = self.table.write().map_err(|_| poisoned())?;

        if table.rows.values().any(|u| u.is_active() && u.email == user.email) {
            return Err(DomainError::conflict("email already exists"));
        }

        let now = Utc::now();
        let id = table.allocate_id();
        let stored = User {
            id: UserId::new(id),
            email: user.email,
            name: user.name,
            password_hash: user.password_hash,
            role: user.role,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };
        table.rows.insert(id, stored.clone());
        Ok(stored)
    }

    async fn get_by_id(&self, id: UserId) -> DomainResult<Option<User>> {
        self.active(id)
    }

    async fn get_by_email(&self, email: &str) -> DomainResult<Option<User>> {
        let table = self.table.read().map_err(|_| poisoned())?;
        Ok(table
            .rows
            .values()
            .find(|u| u.is_active() && u.email == email)
            .cloned())
    }

    async fn list(&self, filter: &UserFilter, pagination: Pagination) -> DomainResult<(Vec<User>, u64)> {
        let table = self.table.read().map_err(|_| poisoned())?;
        let matches = table
            .rows
            .values()
            .filter(|u| u.is_active() && filter.matches(u))
            .cloned()
            .collect();
        Ok(paginate(matches, pagination))
    }

    async fn update(&self, id: UserId, changes: &UserChanges) -> DomainResult<Option<User>> {
        let mut table = self.table.write().map_err(|_| poisoned())?;

        if let Some(email) = &changes.email {
            let taken = table
                .rows
                .values()
                .any(|u| u.is_active() && u.id != id && &u.email == email);
            if taken {
                return Err(DomainError::conflict("email already exists"));
            }
        }

        let Some(user) = table.rows.get_mut(&id.get()).filter(|u| u.is_active()) else {
            return Ok(None);
        };
        changes.apply_to(user, Utc::now());
        Ok(Some(user.clone()))
    }

    async fn soft_delete(&self, id: UserId) -> DomainResult<bool> {
        let mut table = self.table.write().map_err(|_| poisoned())?;
        match table.rows.get_mut(&id.get()).filter(|u| u.is_active()) {
            Some(user) => {
                let now = Utc::now();
                user.deleted_at = Some(now);
                user.updated_at = now;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn ping(&self) -> DomainResult<()> {
        self.table.read().map(|_| ()).map_err(|_| poisoned())
    }
}

/// In-memory product store. Code uniqueness is checked under the write lock.
///
/// Built [`with_owners`](Self::with_owners), reads embed the owner the same way
/// the postgres join does.
#[derive(Debug, Default)]
pub struct InMemoryProductStore {
    table: RwLock<Table<Product>>,
    owners: Option<Arc<InMemoryUserStore>>,
}

impl InMemoryProductStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_owners(users: Arc<InMemoryUserStore>) -> Self {
        Self {
            table: RwLock::default(),
            owners: Some(users),
        }
    }

    // Called after the product lock is released.
    fn attach_owner(&self, product: Product) -> DomainResult<Product> {
        let Some(users) = &self.owners else {
            return Ok(product);
        };
        let owner = users.active(product.user_id)?;
        Ok(product.with_owner(owner))
    }
}

#[async_trait]
impl ProductStore for InMemoryProductStore {
    async fn insert(&self, product: NewProduct) -> DomainResult<Product> {
        let mut table = self.table.write().map_err(|_| poisoned())?;

        if table.rows.values().any(|p| p.is_active() && p.code == product.code) {
            return Err(DomainError::conflict("product code already exists"));
        }

        let now = Utc::now();
        let id = table.allocate_id();
        let stored = Product {
            id: ProductId::new(id),
            code: product.code,
            name: product.name,
            description: product.description,
            price: product.price,
            status: product.status,
            user_id: product.user_id,
            user: None,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };
        table.rows.insert(id, stored.clone());
        Ok(stored)
    }

    async fn get_by_id(&self, id: ProductId) -> DomainResult<Option<Product>> {
        let found = {
            let table = self.table.read().map_err(|_| poisoned())?;
            table.rows.get(&id.get()).filter(|p| p.is_active()).cloned()
        };
        found.map(|p| self.attach_owner(p)).transpose()
    }

    async fn get_by_code(&self, code: &str) -> DomainResult<Option<Product>> {
        let found = {
            let table = self.table.read().map_err(|_| poisoned())?;
            table
                .rows
                .values()
                .find(|p| p.is_active() && p.code == code)
                .cloned()
        };
        found.map(|p| self.attach_owner(p)).transpose()
    }

    async fn list(&self, filter: &ProductFilter, pagination: Pagination) -> DomainResult<(Vec<Product>, u64)> {
        let matches = {
            let table = self.table.read().map_err(|_| poisoned())?;
            table
                .rows
                .values()
                .filter(|p| p.is_active() && filter.matches(p))
                .cloned()
                .collect()
        };
        let (rows, total) = paginate(matches, pagination);
        let rows = rows
            .into_iter()
            .map(|p| self.attach_owner(p))
            .collect::<DomainResult<Vec<_>>>()?;
        Ok((rows, total))
    }

    async fn count_by_owner(&self, user_id: UserId) -> DomainResult<u64> {
        let table = self.table.read().map_err(|_| poisoned())?;
        Ok(table
            .rows
            .values()
            .filter(|p| p.is_active() && p.user_id == user_id)
            .count() as u64)
    }

    async fn update(&self, id: ProductId, changes: &ProductChanges) -> DomainResult<Option<Product>> {
        let mut table = self.table.write().map_err(|_| poisoned())?;

        if let Some(code) = &changes.code {
            let taken = table
                .rows
                .values()
                .any(|p| p.is_active() && p.id != id && &p.code == code);
            if taken {
                return Err(DomainError::conflict("product code already exists"));
            }
        }

        let Some(product) = table.rows.get_mut(&id.get()).filter(|p| p.is_active()) else {
            return Ok(None);
        };
        changes.apply_to(product, Utc::now());
        Ok(Some(product.clone()))
    }

    async fn soft_delete(&self, id: ProductId) -> DomainResult<bool> {
        let mut table = self.table.write().map_err(|_| poisoned())?;
        match table.rows.get_mut(&id.get()).filter(|p| p.is_active()) {
            Some(product) => {
                let now = Utc::now();
                product.deleted_at = Some(now);
                product.updated_at = now;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn ping(&self) -> DomainResult<()> {
        self.table.read().map(|_| ()).map_err(|_| poisoned())
    }
}

#[cfg(test)]
mod tests {
    use marketplace_auth::Role;

    use super::*;

    fn page(page: u32, page_size: u32) -> Pagination {
        Pagination { page, page_size }
    }

    fn new_product(code: &str, owner: i64) -> NewProduct {
        NewProduct {
            code: code.into(),
            name: format!("Product {code}"),
            description: None,
            price: 100,
            status: "active".into(),
            user_id: UserId::new(owner),
        }
    }

    #[tokio::test]
    async fn ids_are_monotonic_and_never_reused() {
        let store = InMemoryUserStore::new();
        let a = store.insert(NewUser::new("a@x.io", "A", "h")).await.unwrap();
        store.soft_delete(a.id).await.unwrap();
        let b = store.insert(NewUser::new("b@x.io", "B", "h")).await.unwrap();
        assert_eq!(a.id, UserId::new(1));
        assert_eq!(b.id, UserId::new(2));
    }

    #[tokio::test]
    async fn duplicate_email_conflicts_until_deleted() {
        let store = InMemoryUserStore::new();
        let first = store.insert(NewUser::new("dup@x.io", "A", "h")).await.unwrap();

        let err = store.insert(NewUser::new("dup@x.io", "B", "h")).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));

        assert!(store.soft_delete(first.id).await.unwrap());
        let again = store
            .insert(NewUser::new("dup@x.io", "C", "h").with_role(Role::Admin))
            .await
            .unwrap();
        assert_eq!(again.role, Role::Admin);
    }

    #[tokio::test]
    async fn soft_deleted_users_are_invisible() {
        let store = InMemoryUserStore::new();
        let user = store.insert(NewUser::new("gone@x.io", "G", "h")).await.unwrap();
        assert!(store.soft_delete(user.id).await.unwrap());

        assert_eq!(store.get_by_id(user.id).await.unwrap(), None);
        assert_eq!(store.get_by_email("gone@x.io").await.unwrap(), None);
        assert_eq!(store.list(&UserFilter::default(), page(1, 10)).await.unwrap().1, 0);
        assert!(!store.soft_delete(user.id).await.unwrap());
        assert_eq!(store.update(user.id, &UserChanges::default()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn update_rejects_email_of_another_user() {
        let store = InMemoryUserStore::new();
        store.insert(NewUser::new("a@x.io", "A", "h")).await.unwrap();
        let b = store.insert(NewUser::new("b@x.io", "B", "h")).await.unwrap();

        let changes = UserChanges { email: Some("a@x.io".into()), ..Default::default() };
        assert!(matches!(store.update(b.id, &changes).await, Err(DomainError::Conflict(_))));

        let same = UserChanges { email: Some("b@x.io".into()), ..Default::default() };
        assert!(store.update(b.id, &same).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn list_pages_in_id_order() {
        let store = InMemoryProductStore::new();
        for i in 0..7 {
            store.insert(new_product(&format!("P{i}"), 1)).await.unwrap();
        }

        let (rows, total) = store.list(&ProductFilter::default(), page(2, 3)).await.unwrap();
        assert_eq!(total, 7);
        let ids: Vec<i64> = rows.iter().map(|p| p.id.get()).collect();
        assert_eq!(ids, vec![4, 5, 6]);

        let (rows, _) = store.list(&ProductFilter::default(), page(3, 3)).await.unwrap();
        assert_eq!(rows.len(), 1);

        let (rows, total) = store.list(&ProductFilter::default(), page(9, 3)).await.unwrap();
        assert!(rows.is_empty());
        assert_eq!(total, 7);
    }

    #[tokio::test]
    async fn owner_count_ignores_deleted_and_foreign_products() {
        let store = InMemoryProductStore::new();
        let p1 = store.insert(new_product("A", 1)).await.unwrap();
        store.insert(new_product("B", 1)).await.unwrap();
        store.insert(new_product("C", 2)).await.unwrap();
        store.soft_delete(p1.id).await.unwrap();

        assert_eq!(store.count_by_owner(UserId::new(1)).await.unwrap(), 1);
        assert_eq!(store.count_by_owner(UserId::new(2)).await.unwrap(), 1);
        assert_eq!(store.count_by_owner(UserId::new(3)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn reads_embed_the_active_owner() {
        let users = Arc::new(InMemoryUserStore::new());
        let owner = users.insert(NewUser::new("owner@x.io", "Owner", "h")).await.unwrap();
        let store = InMemoryProductStore::with_owners(users.clone());

        let created = store.insert(new_product("OWN", owner.id.get())).await.unwrap();
        assert_eq!(created.user, None);

        let fetched = store.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(fetched.user.as_ref().map(|u| u.email.as_str()), Some("owner@x.io"));
        let by_code = store.get_by_code("OWN").await.unwrap().unwrap();
        assert_eq!(by_code.user.map(|u| u.id), Some(owner.id));
        let (rows, _) = store.list(&ProductFilter::default(), page(1, 10)).await.unwrap();
        assert!(rows[0].user.is_some());

        users.soft_delete(owner.id).await.unwrap();
        assert_eq!(store.get_by_id(created.id).await.unwrap().unwrap().user, None);
    }

    #[tokio::test]
    async fn product_code_is_unique_among_active_rows() {
        let store = InMemoryProductStore::new();
        let first = store.insert(new_product("SKU", 1)).await.unwrap();
        assert!(matches!(store.insert(new_product("SKU", 2)).await, Err(DomainError::Conflict(_))));

        store.soft_delete(first.id).await.unwrap();
        assert!(store.insert(new_product("SKU", 2)).await.is_ok());
    }
}
