//! Input shape rules for user fields.

use serde::{Deserialize, Serialize};

use marketplace_core::{DomainError, DomainResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationConfig {
    pub min_password_length: usize,
    pub max_name_length: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            min_password_length: 8,
            max_name_length: 100,
        }
    }
}

impl ValidationConfig {
    pub fn validate_name(&self, name: &str) -> DomainResult<()> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(DomainError::validation("name is required"));
        }
        if trimmed.chars().count() > self.max_name_length {
            return Err(DomainError::validation(format!(
                "name must be at most {} characters",
                self.max_name_length
            )));
        }
        Ok(())
    }

    /// Checked on the plaintext, before hashing.
    pub fn validate_password(&self, password: &str) -> DomainResult<()> {
        if password.chars().count() < self.min_password_length {
            return Err(DomainError::validation(format!(
                "password must be at least {} characters",
                self.min_password_length
            )));
        }
        Ok(())
    }

    pub fn validate_email(&self, email: &str) -> DomainResult<()> {
        validate_email(email)
    }
}

/// Structural check only: `local@domain.tld`, no whitespace, one `@`.
pub fn validate_email(email: &str) -> DomainResult<()> {
    let invalid = || DomainError::validation(format!("invalid email: {email:?}"));

    if email.is_empty() || email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') {
        return Err(invalid());
    }

    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 || labels.iter().any(|l| l.is_empty()) {
        return Err(invalid());
    }

    Ok(())
}
