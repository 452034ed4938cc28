use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use marketplace_auth::{Role, TokenSubject};
use marketplace_core::{Entity, UserId};

/// A registered account.
///
/// `password_hash` never leaves the process: it is skipped on serialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub name: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for User {
    type Id = UserId;

    fn id(&self) -> UserId {
        self.id
    }

    fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }
}

impl TokenSubject for User {
    fn subject_id(&self) -> UserId {
        self.id
    }

    fn subject_role(&self) -> Role {
        self.role
    }

    fn subject_email(&self) -> &str {
        &self.email
    }
}

/// Input for creating a user. The password is already hashed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub role: Role,
}

impl NewUser {
    pub fn new(email: impl Into<String>, name: impl Into<String>, password_hash: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: name.into(),
            password_hash: password_hash.into(),
            role: Role::default(),
        }
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }
}

/// Partial update. Only `Some` fields are applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub role: Option<Role>,
}

impl UserChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.password_hash.is_none() && self.role.is_none()
    }

    /// Apply to an in-memory copy, bumping `updated_at`.
    pub fn apply_to(&self, user: &mut User, now: DateTime<Utc>) {
        if let Some(name) = &self.name {
            user.name = name.clone();
        }
        if let Some(email) = &self.email {
            user.email = email.clone();
        }
        if let Some(hash) = &self.password_hash {
            user.password_hash = hash.clone();
        }
        if let Some(role) = self.role {
            user.role = role;
        }
        user.updated_at = now;
    }
}

/// Listing filter: substring match on each present field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserFilter {
    pub email: Option<String>,
    pub name: Option<String>,
}

impl UserFilter {
    pub fn matches(&self, user: &User) -> bool {
        let email_ok = self.email.as_deref().is_none_or(|e| user.email.contains(e));
        let name_ok = self.name.as_deref().is_none_or(|n| user.name.contains(n));
        email_ok && name_ok
    }
}
