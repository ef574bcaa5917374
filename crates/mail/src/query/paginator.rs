//! Stateful random-access paging over a finished result set

use serde::Serialize;

use crate::error::QueryError;

pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Snapshot of the paginator position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageInfo {
    /// 1-based current page, 0 when there are no items
    pub current_page: usize,
    pub total_pages: usize,
    pub total_items: usize,
    pub items_per_page: usize,
}

/// Fixed-size pages over an owned sequence.
///
/// The current page is always within `1..=total_pages`, or 0 when the
/// sequence is empty.
#[derive(Debug, Clone)]
pub struct Paginator<T> {
    items: Vec<T>,
    page_size: usize,
    current_page: usize,
}

impl<T> Paginator<T> {
    pub fn new(items: Vec<T>, page_size: usize) -> Result<Self, QueryError> {
        if page_size == 0 {
            return Err(QueryError::invalid_argument(
                "page size",
                "page size must be at least 1",
            ));
        }
        let current_page = if items.is_empty() { 0 } else { 1 };
        Ok(Self {
            items,
            page_size,
            current_page,
        })
    }

    /// Paginator with the default page size of 10
    pub fn with_default_size(items: Vec<T>) -> Self {
        let current_page = if items.is_empty() { 0 } else { 1 };
        Self {
            items,
            page_size: DEFAULT_PAGE_SIZE,
            current_page,
        }
    }

    pub fn total_pages(&self) -> usize {
        self.items.len().div_ceil(self.page_size)
    }

    pub fn current_page_number(&self) -> usize {
        self.current_page
    }

    /// Items on the current page; empty when there are no items
    pub fn get_current_page(&self) -> &[T] {
        if self.current_page == 0 {
            return &[];
        }
        let start = (self.current_page - 1) * self.page_size;
        let end = (start + self.page_size).min(self.items.len());
        &self.items[start..end]
    }

    /// Advance one page. Returns false and stays put on the last page.
    pub fn next_page(&mut self) -> bool {
        if self.current_page < self.total_pages() {
            self.current_page += 1;
            true
        } else {
            false
        }
    }

    /// Go back one page. Returns false and stays put on the first page.
    pub fn prev_page(&mut self) -> bool {
        if self.current_page > 1 {
            self.current_page -= 1;
            true
        } else {
            false
        }
    }

    /// Jump to a 1-based page. Out-of-range pages leave the position unchanged.
    pub fn go_to_page(&mut self, page: usize) -> bool {
        if page == 0 || page > self.total_pages() {
            return false;
        }
        self.current_page = page;
        true
    }

    pub fn is_first_page(&self) -> bool {
        self.current_page <= 1
    }

    pub fn is_last_page(&self) -> bool {
        self.current_page == self.total_pages()
    }

    pub fn get_page_info(&self) -> PageInfo {
        PageInfo {
            current_page: self.current_page,
            total_pages: self.total_pages(),
            total_items: self.items.len(),
            items_per_page: self.page_size,
        }
    }
}
