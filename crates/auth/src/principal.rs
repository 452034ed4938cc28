use serde::{Deserialize, Serialize};

use marketplace_core::UserId;

use crate::{Claims, Role};

/// Identity of an authenticated caller, derived from validated claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: UserId,
    pub role: Role,
    pub email: String,
}

impl Principal {
    pub fn new(user_id: UserId, role: Role, email: impl Into<String>) -> Self {
        Self {
            user_id,
            role,
            email: email.into(),
        }
    }
}

impl From<Claims> for Principal {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.user_id,
            role: claims.role,
            email: claims.sub,
        }
    }
}
