//! Page request handling for list queries.

use lex_core::responses::Page;

/// 1-based page number and page size, already clamped by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paging {
    pub page: u32,
    pub page_size: u32,
}

impl Paging {
    #[must_use]
    pub fn new(page: Option<u32>, page_size: u32) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            page_size: page_size.max(1),
        }
    }

    #[must_use]
    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.page_size)
    }

    #[must_use]
    pub fn limit(&self) -> i64 {
        i64::from(self.page_size)
    }

    /// Wrap fetched rows into a [`Page`].
    #[must_use]
    pub fn page<T>(&self, items: Vec<T>, total: i64) -> Page<T> {
        Page {
            items,
            total,
            page: self.page,
            page_size: self.page_size,
        }
    }
}

impl Default for Paging {
    fn default() -> Self {
        Self::new(None, 20)
    }
}
