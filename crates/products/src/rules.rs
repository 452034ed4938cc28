//! Product business rules.
//!
//! Deterministic checks with no IO; the service runs them before touching the store.

use serde::{Deserialize, Serialize};

use marketplace_core::{DomainError, DomainResult};

use crate::{NewProduct, ProductChanges};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessRules {
    /// Active products one owner may hold.
    pub max_products_per_user: u64,
    pub default_product_status: String,
}

impl Default for BusinessRules {
    fn default() -> Self {
        Self {
            max_products_per_user: 1000,
            default_product_status: "active".to_string(),
        }
    }
}

impl BusinessRules {
    pub fn validate_new(&self, product: &NewProduct) -> DomainResult<()> {
        validate_code(&product.code)?;
        validate_name(&product.name)?;
        validate_price(product.price)
    }

    pub fn validate_changes(&self, changes: &ProductChanges) -> DomainResult<()> {
        if let Some(code) = &changes.code {
            validate_code(code)?;
        }
        if let Some(name) = &changes.name {
            validate_name(name)?;
        }
        if let Some(price) = changes.price {
            validate_price(price)?;
        }
        if let Some(status) = &changes.status {
            if status.trim().is_empty() {
                return Err(DomainError::validation("status cannot be empty"));
            }
        }
        Ok(())
    }

    /// `true` when an owner already holding `owned` products may not add another.
    pub fn quota_reached(&self, owned: u64) -> bool {
        owned >= self.max_products_per_user
    }

    pub fn resolve_status(&self, status: &str) -> String {
        if status.trim().is_empty() {
            self.default_product_status.clone()
        } else {
            status.to_string()
        }
    }
}

fn validate_code(code: &str) -> DomainResult<()> {
    if code.trim().is_empty() {
        return Err(DomainError::validation("code is required"));
    }
    Ok(())
}

fn validate_name(name: &str) -> DomainResult<()> {
    if name.trim().is_empty() {
        return Err(DomainError::validation("name is required"));
    }
    Ok(())
}

fn validate_price(price: i64) -> DomainResult<()> {
    if price < 0 {
        return Err(DomainError::validation("price must be >= 0"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use marketplace_core::UserId;

    fn new_product(code: &str, name: &str, price: i64) -> NewProduct {
        NewProduct {
            code: code.into(),
            name: name.into(),
            description: None,
            price,
            status: String::new(),
            user_id: UserId::new(1),
        }
    }

    #[test]
    fn blank_code_or_name_is_rejected() {
        let rules = BusinessRules::default();
        assert!(matches!(rules.validate_new(&new_product("  ", "n", 1)), Err(DomainError::Validation(_))));
        assert!(matches!(rules.validate_new(&new_product("c", "", 1)), Err(DomainError::Validation(_))));
    }

    #[test]
    fn zero_price_is_allowed() {
        assert!(BusinessRules::default().validate_new(&new_product("c", "n", 0)).is_ok());
    }

    #[test]
    fn changes_only_check_present_fields() {
        let rules = BusinessRules::default();
        assert!(rules.validate_changes(&ProductChanges::default()).is_ok());
        assert!(rules
            .validate_changes(&ProductChanges { price: Some(-1), ..Default::default() })
            .is_err());
        assert!(rules
            .validate_changes(&ProductChanges { status: Some(" ".into()), ..Default::default() })
            .is_err());
    }

    #[test]
    fn quota_boundary() {
        let rules = BusinessRules { max_products_per_user: 3, ..Default::default() };
        assert!(!rules.quota_reached(2));
        assert!(rules.quota_reached(3));
    }

    #[test]
    fn empty_status_resolves_to_default() {
        let rules = BusinessRules::default();
        assert_eq!(rules.resolve_status(""), "active");
        assert_eq!(rules.resolve_status("draft"), "draft");
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: the sign of the price alone decides price validity.
            #[test]
            fn price_sign_decides_validity(price in any::<i64>()) {
                let result = BusinessRules::default().validate_new(&new_product("C-1", "Item", price));
                prop_assert_eq!(result.is_ok(), price >= 0);
            }
        }
    }
}
