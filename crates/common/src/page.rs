//! Pagination types shared by every listing operation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Largest page a caller may request.
pub const MAX_PAGE_SIZE: u32 = 100;

const DEFAULT_PAGE_SIZE: u32 = 20;

/// A malformed pagination request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid page size {size}: must be between 1 and {MAX_PAGE_SIZE}")]
pub struct InvalidPageRequest {
    pub size: u32,
}

/// A zero-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    page: u32,
    size: u32,
}

impl PageRequest {
    /// Creates a page request, rejecting sizes outside `1..=MAX_PAGE_SIZE`.
    pub fn new(page: u32, size: u32) -> Result<Self, InvalidPageRequest> {
        if size == 0 || size > MAX_PAGE_SIZE {
            return Err(InvalidPageRequest { size });
        }
        Ok(Self { page, size })
    }

    /// Returns the first page with the given size.
    pub fn first(size: u32) -> Result<Self, InvalidPageRequest> {
        Self::new(0, size)
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    /// Number of rows to skip.
    pub fn offset(&self) -> u64 {
        u64::from(self.page) * u64::from(self.size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 0,
            size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// One page of results together with the total number of matching rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub size: u32,
    pub total: u64,
}

impl<T> Page<T> {
    /// Builds a page from the rows of the requested window.
    pub fn new(items: Vec<T>, request: PageRequest, total: u64) -> Self {
        Self {
            items,
            page: request.page,
            size: request.size,
            total,
        }
    }

    /// Cuts the requested window out of a fully materialised, ordered result.
    pub fn from_all(all: Vec<T>, request: PageRequest) -> Self {
        let total = all.len() as u64;
        let items = all
            .into_iter()
            .skip(request.offset() as usize)
            .take(request.size as usize)
            .collect();
        Self::new(items, request, total)
    }

    /// Total number of pages for this page size.
    pub fn total_pages(&self) -> u64 {
        if self.size == 0 {
            return 0;
        }
        self.total.div_ceil(u64::from(self.size))
    }

    /// Converts the items, keeping the paging information.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            size: self.size,
            total: self.total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_and_oversized_pages() {
        assert!(PageRequest::new(0, 0).is_err());
        assert!(PageRequest::new(0, MAX_PAGE_SIZE + 1).is_err());
        assert!(PageRequest::new(3, MAX_PAGE_SIZE).is_ok());
    }

    #[test]
    fn offset_is_page_times_size() {
        let request = PageRequest::new(2, 10).unwrap();
        assert_eq!(request.offset(), 20);
    }

    #[test]
    fn from_all_slices_the_requested_window() {
        let request = PageRequest::new(1, 2).unwrap();
        let page = Page::from_all(vec![1, 2, 3, 4, 5], request);
        assert_eq!(page.items, vec![3, 4]);
        assert_eq!(page.total, 5);
        assert_eq!(page.total_pages(), 3);
    }

    #[test]
    fn from_all_past_the_end_is_empty() {
        let request = PageRequest::new(4, 2).unwrap();
        let page = Page::from_all(vec![1, 2, 3], request);
        assert!(page.items.is_empty());
        assert_eq!(page.total, 3);
    }

    #[test]
    fn map_keeps_paging() {
        let page = Page::from_all(vec![1, 2], PageRequest::default()).map(|n| n * 10);
        assert_eq!(page.items, vec![10, 20]);
        assert_eq!(page.size, 20);
    }
}
