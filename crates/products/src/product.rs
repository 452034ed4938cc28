use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use marketplace_core::{Entity, ProductId, UserId};
use marketplace_users::User;

/// A catalog entry. `price` is in the smallest currency unit (e.g. cents).
///
/// `user` is the embedded owner. Stores fill it on reads (by id, by code, list)
/// and leave it empty on writes, or when the owner has been soft-deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub price: i64,
    pub status: String,
    pub user_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn with_owner(mut self, owner: Option<User>) -> Self {
        self.user = owner;
        self
    }
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> ProductId {
        self.id
    }

    fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }
}

/// Input for creating a product. An empty `status` is replaced by the configured default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: i64,
    #[serde(default)]
    pub status: String,
    pub user_id: UserId,
}

/// Partial update. Only `Some` fields are applied.
///
/// `description` is doubly optional: `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductChanges {
    pub code: Option<String>,
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub price: Option<i64>,
    pub status: Option<String>,
}

impl ProductChanges {
    pub fn apply_to(&self, product: &mut Product, now: DateTime<Utc>) {
        if let Some(code) = &self.code {
            product.code = code.clone();
        }
        if let Some(name) = &self.name {
            product.name = name.clone();
        }
        if let Some(description) = &self.description {
            product.description = description.clone();
        }
        if let Some(price) = self.price {
            product.price = price;
        }
        if let Some(status) = &self.status {
            product.status = status.clone();
        }
        product.updated_at = now;
    }
}

/// Listing filter: substring on `code`/`name`, exact on `status`/`user_id`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductFilter {
    pub code: Option<String>,
    pub name: Option<String>,
    pub status: Option<String>,
    pub user_id: Option<UserId>,
}

impl ProductFilter {
    pub fn owned_by(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
            ..Self::default()
        }
    }

    pub fn matches(&self, product: &Product) -> bool {
        self.code.as_deref().is_none_or(|c| product.code.contains(c))
            && self.name.as_deref().is_none_or(|n| product.name.contains(n))
            && self.status.as_deref().is_none_or(|s| product.status == s)
            && self.user_id.is_none_or(|u| product.user_id == u)
    }
}
