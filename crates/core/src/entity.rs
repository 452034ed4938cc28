//! Entity trait: identity + soft-delete lifecycle.

use chrono::{DateTime, Utc};

/// Entity marker + minimal interface.
///
/// Entities are never physically removed; deletion stamps `deleted_at` and the
/// record becomes invisible to lookups, listings and uniqueness checks.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Copy + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> Self::Id;

    /// Soft-delete timestamp, if the entity has been deleted.
    fn deleted_at(&self) -> Option<DateTime<Utc>>;

    fn is_active(&self) -> bool {
        self.deleted_at().is_none()
    }
}
