//! Pagination primitives shared by every listing.
//!
//! Callers pass a raw [`PageRequest`] (possibly absent, possibly nonsense); the
//! service normalizes it against a [`PaginationConfig`] into a [`Pagination`]
//! before hitting the store, and wraps the result in [`Paginated`].

use serde::{Deserialize, Serialize};

/// Configured page-size bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationConfig {
    pub default_page_size: u32,
    pub max_page_size: u32,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page_size: 10,
            max_page_size: 100,
        }
    }
}

impl PaginationConfig {
    /// Normalize a raw request.
    ///
    /// - missing request: page 1, default size
    /// - `page < 1`: page 1
    /// - `page_size < 1`: default size
    /// - `page_size > max`: max
    pub fn normalize(&self, request: Option<PageRequest>) -> Pagination {
        let request = request.unwrap_or_default();

        let page = match request.page {
            Some(p) if p >= 1 => u32::try_from(p).unwrap_or(u32::MAX),
            _ => 1,
        };

        let page_size = match request.page_size {
            Some(s) if s >= 1 => u32::try_from(s).unwrap_or(u32::MAX),
            _ => self.default_page_size,
        }
        .min(self.max_page_size)
        .max(1);

        Pagination { page, page_size }
    }
}

/// Raw pagination input (query string / caller supplied).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl PageRequest {
    pub fn new(page: i64, page_size: i64) -> Self {
        Self {
            page: Some(page),
            page_size: Some(page_size),
        }
    }
}

/// Normalized pagination: 1-based page, bounded page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub page_size: u32,
}

impl Pagination {
    /// Number of rows to skip.
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.page_size)
    }

    pub fn limit(&self) -> u64 {
        u64::from(self.page_size)
    }
}

/// One page of results plus the totals needed to walk the rest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub page: u32,
    pub page_size: u32,
    pub total: u64,
    pub total_pages: u64,
}

impl<T> Paginated<T> {
    pub fn new(data: Vec<T>, pagination: Pagination, total: u64) -> Self {
        Self {
            data,
            page: pagination.page,
            page_size: pagination.page_size,
            total,
            total_pages: total_pages(total, pagination.page_size),
        }
    }
}

/// `ceil(total / page_size)`; zero when there is nothing to show.
pub fn total_pages(total: u64, page_size: u32) -> u64 {
    if page_size == 0 {
        return 0;
    }
    total.div_ceil(u64::from(page_size))
}
