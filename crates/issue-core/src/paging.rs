//! Page number/size validation and the page envelope.

use serde::Serialize;

use crate::error::{IssueError, Result};

pub const MAX_PAGE_SIZE: u32 = 100;
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Validated, 1-based paging request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PagingOptions {
    page_number: u32,
    page_size: u32,
}

impl PagingOptions {
    /// # Errors
    ///
    /// Returns `Validation` on `pageNumber` when it is 0, or on `pageSize`
    /// when it is outside `1..=MAX_PAGE_SIZE`.
    pub fn new(page_number: u32, page_size: u32) -> Result<Self> {
        if page_number < 1 {
            return Err(IssueError::validation(
                "pageNumber",
                "must be greater than or equal to 1",
            ));
        }
        if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
            return Err(IssueError::validation(
                "pageSize",
                format!("must be between 1 and {MAX_PAGE_SIZE}"),
            ));
        }
        Ok(Self {
            page_number,
            page_size,
        })
    }

    /// First page of `page_size` items.
    ///
    /// # Errors
    ///
    /// Same as [`PagingOptions::new`].
    pub fn first(page_size: u32) -> Result<Self> {
        Self::new(1, page_size)
    }

    #[must_use]
    pub const fn page_number(&self) -> u32 {
        self.page_number
    }

    #[must_use]
    pub const fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Items to skip: `(page_number - 1) * page_size`.
    #[must_use]
    pub fn skip(&self) -> usize {
        (self.page_number as usize - 1) * self.page_size as usize
    }

    /// Items to take: `page_size`.
    #[must_use]
    pub fn take(&self) -> usize {
        self.page_size as usize
    }
}

impl Default for PagingOptions {
    fn default() -> Self {
        Self {
            page_number: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// One page of results plus the total match count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page_number: u32,
    pub page_size: u32,
    pub total_count: usize,
}

impl<T> Page<T> {
    #[must_use]
    pub fn new(items: Vec<T>, paging: PagingOptions, total_count: usize) -> Self {
        Self {
            items,
            page_number: paging.page_number,
            page_size: paging.page_size,
            total_count,
        }
    }

    #[must_use]
    pub fn total_pages(&self) -> usize {
        self.total_count.div_ceil(self.page_size.max(1) as usize)
    }

    #[must_use]
    pub const fn has_previous(&self) -> bool {
        self.page_number > 1
    }

    #[must_use]
    pub fn has_next(&self) -> bool {
        (self.page_number as usize) < self.total_pages()
    }

    /// Map every item, keeping the paging metadata.
    #[must_use]
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page_number: self.page_number,
            page_size: self.page_size,
            total_count: self.total_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_of(err: IssueError) -> String {
        match err {
            IssueError::Validation { field, .. } => field,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_skip_take() {
        let paging = PagingOptions::new(3, 10).unwrap();
        assert_eq!(paging.skip(), 20);
        assert_eq!(paging.take(), 10);
        assert_eq!(PagingOptions::first(25).unwrap().skip(), 0);
    }

    #[test]
    fn test_page_number_zero_rejected() {
        assert_eq!(field_of(PagingOptions::new(0, 10).unwrap_err()), "pageNumber");
    }

    #[test]
    fn test_page_size_bounds() {
        assert_eq!(field_of(PagingOptions::new(1, 0).unwrap_err()), "pageSize");
        assert_eq!(
            field_of(PagingOptions::new(1, MAX_PAGE_SIZE + 1).unwrap_err()),
            "pageSize"
        );
        assert!(PagingOptions::new(1, MAX_PAGE_SIZE).is_ok());
        assert!(PagingOptions::new(1, 1).is_ok());
    }

    #[test]
    fn test_page_navigation() {
        let paging = PagingOptions::new(2, 10).unwrap();
        let page = Page::new(vec![(); 10], paging, 25);
        assert_eq!(page.total_pages(), 3);
        assert!(page.has_previous());
        assert!(page.has_next());

        let last = Page::new(vec![(); 5], PagingOptions::new(3, 10).unwrap(), 25);
        assert!(!last.has_next());

        let empty: Page<()> = Page::new(vec![], PagingOptions::default(), 0);
        assert_eq!(empty.total_pages(), 0);
        assert!(!empty.has_previous());
        assert!(!empty.has_next());
    }

    #[test]
    fn test_page_map_keeps_metadata() {
        let page = Page::new(vec![1, 2], PagingOptions::new(1, 2).unwrap(), 4);
        let mapped = page.map(|n| n * 10);
        assert_eq!(mapped.items, vec![10, 20]);
        assert_eq!(mapped.total_count, 4);
        assert!(mapped.has_next());
    }
}
