//! Page-number pagination types
//!
//! Ticket listings and other large collections are paged with classic
//! page/limit arguments and return an envelope carrying the total count,
//! so clients can render page controls without a second query.
//!
//! # Usage
//!
//! ```rust,ignore
//! let args = PageArgs { page: 2, limit: 25 }.clamped();
//!
//! // In model
//! let items = Model::find_page(args.limit, args.offset(), pool).await?;
//! let total = Model::count(pool).await?;
//!
//! // Build envelope
//! let page = Paginated::new(items, total, args);
//! ```

use serde::{Deserialize, Serialize};

/// Default page size when the caller does not specify one.
pub const DEFAULT_PAGE_LIMIT: i64 = 10;

/// Upper bound on page size.
pub const MAX_PAGE_LIMIT: i64 = 100;

// ============================================================================
// Page Arguments
// ============================================================================

/// Input arguments for page-number pagination (1-based).
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PageArgs {
    /// 1-based page number.
    pub page: i64,
    /// Number of items per page.
    pub limit: i64,
}

impl Default for PageArgs {
    fn default() -> Self {
        PageArgs {
            page: 1,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

impl PageArgs {
    pub fn new(page: i64, limit: i64) -> Self {
        PageArgs { page, limit }
    }

    /// Normalize out-of-range arguments: page floors at 1, limit is bounded
    /// to 1..=100.
    pub fn clamped(self) -> Self {
        PageArgs {
            page: self.page.max(1),
            limit: self.limit.clamp(1, MAX_PAGE_LIMIT),
        }
    }

    /// SQL OFFSET for this page. Call on clamped arguments.
    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.limit
    }
}

// ============================================================================
// Paginated envelope
// ============================================================================

/// Counts describing where a page sits in the full collection.
#[derive(Debug, Clone, Serialize)]
pub struct PageInfo {
    /// Total items across all pages.
    pub total: i64,
    /// Total number of pages at this limit.
    pub pages: i64,
    /// The 1-based page that was returned.
    pub page: i64,
    /// The page size that was applied.
    pub limit: i64,
}

/// A single page of results plus its pagination metadata.
#[derive(Debug, Clone, Serialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub pagination: PageInfo,
}

impl<T> Paginated<T> {
    /// Build the envelope from one page of items and the collection total.
    pub fn new(items: Vec<T>, total: i64, args: PageArgs) -> Self {
        Paginated {
            items,
            pagination: PageInfo {
                total,
                pages: {
                    let limit = args.limit.max(1);
                    total / limit + (total % limit > 0) as i64
                },
                page: args.page,
                limit: args.limit,
            },
        }
    }
}
