//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Services return these; the HTTP layer maps each kind to a status code.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Malformed input (bad email, negative price, ...).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A referenced entity does not exist (or is soft-deleted).
    #[error("{0} not found")]
    NotFound(String),

    /// A uniqueness rule was violated.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A per-owner limit has been reached.
    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),

    /// Bad credentials or token.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated, but the role is not allowed.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Unexpected store or crypto failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(entity: impl Into<String>) -> Self {
        Self::NotFound(entity.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn quota_exceeded(msg: impl Into<String>) -> Self {
        Self::QuotaExceeded(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Stable snake_case name of the error kind (used in API payloads).
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::QuotaExceeded(_) => "quota_exceeded",
            Self::Unauthorized(_) => "unauthorized",
            Self::Forbidden(_) => "forbidden",
            Self::Internal(_) => "internal_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_names_the_entity() {
        assert_eq!(DomainError::not_found("product").to_string(), "product not found");
    }

    #[test]
    fn kinds_are_distinct() {
        let all = [
            DomainError::validation("x"),
            DomainError::not_found("x"),
            DomainError::conflict("x"),
            DomainError::quota_exceeded("x"),
            DomainError::unauthorized("x"),
            DomainError::forbidden("x"),
            DomainError::internal("x"),
        ];
        let mut kinds: Vec<_> = all.iter().map(DomainError::kind).collect();
        kinds.sort_unstable();
        kinds.dedup();
        assert_eq!(kinds.len(), all.len());
    }
}
