use serde::Serialize;
use thiserror::Error;

use crate::{Principal, Role};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("insufficient permissions: role '{role}' is not one of [{allowed}]")]
    RoleNotAllowed { role: Role, allowed: String },
}

/// Allow-list of roles permitted to perform an operation.
///
/// Routes attach one policy each; the check runs per request against the
/// principal derived from the token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessPolicy {
    allowed: Vec<Role>,
}

impl AccessPolicy {
    pub fn any_of(roles: impl IntoIterator<Item = Role>) -> Self {
        let mut allowed: Vec<Role> = Vec::new();
        for role in roles {
            if !allowed.contains(&role) {
                allowed.push(role);
            }
        }
        Self { allowed }
    }

    /// Any authenticated principal.
    pub fn authenticated() -> Self {
        Self::any_of(Role::ALL)
    }

    pub fn admin_only() -> Self {
        Self::any_of([Role::Admin])
    }

    pub fn allows(&self, role: Role) -> bool {
        self.allowed.contains(&role)
    }

    pub fn allowed_roles(&self) -> &[Role] {
        &self.allowed
    }
}

/// Authorize a principal against a policy.
///
/// - No IO
/// - No panics
pub fn authorize(principal: &Principal, policy: &AccessPolicy) -> Result<(), AuthzError> {
    if policy.allows(principal.role) {
        return Ok(());
    }

    let allowed = policy
        .allowed_roles()
        .iter()
        .map(Role::as_str)
        .collect::<Vec<_>>()
        .join(", ");

    Err(AuthzError::RoleNotAllowed {
        role: principal.role,
        allowed,
    })
}
