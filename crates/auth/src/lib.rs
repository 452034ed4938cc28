//! `marketplace-auth`: credentials and access control.
//!
//! This crate is decoupled from HTTP and storage: it hashes/verifies passwords,
//! signs/validates tokens and evaluates role allow-lists.

pub mod authorize;
pub mod claims;
pub mod credentials;
pub mod principal;
pub mod roles;

pub use authorize::{AccessPolicy, AuthzError, authorize};
pub use claims::{Claims, TokenValidationError, validate_claims};
pub use credentials::{AuthConfig, CredentialError, CredentialService, TokenError, TokenSubject};
pub use principal::Principal;
pub use roles::{Role, UnknownRole};
