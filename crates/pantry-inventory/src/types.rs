use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{InventoryError, Result};

/// Largest page a client may request from a paged listing.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Body of create/update requests for a food.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FoodInput {
    pub name: String,
    pub category_id: i64,
    pub admission_date: NaiveDate,
}

/// Body of create/update requests for a category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryInput {
    pub name: String,
}

/// Reject blank names before they reach SQLite.
pub(crate) fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(InventoryError::InvalidInput(
            "name cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// 1-based page selector.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PageRequest {
    pub page: u32,
    pub size: u32,
}

impl PageRequest {
    pub fn validate(&self) -> Result<()> {
        if self.page == 0 {
            return Err(InventoryError::InvalidInput("page starts at 1".to_string()));
        }
        if self.size == 0 || self.size > MAX_PAGE_SIZE {
            return Err(InventoryError::InvalidInput(format!(
                "size must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }
        Ok(())
    }

    pub(crate) fn offset(&self) -> u64 {
        (self.page as u64 - 1) * self.size as u64
    }
}

/// One page of a listing plus the navigation fields clients render.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub size: u32,
    pub total: u64,
    pub total_pages: u64,
    pub has_next: bool,
    pub has_previous: bool,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, req: PageRequest, total: u64) -> Self {
        let total_pages = total.div_ceil(req.size as u64);
        Self {
            items,
            page: req.page,
            size: req.size,
            total,
            total_pages,
            has_next: (req.page as u64) < total_pages,
            has_previous: req.page > 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_navigation_fields() {
        let page = Page::new(vec![1, 2], PageRequest { page: 2, size: 2 }, 5);
        assert_eq!(page.total_pages, 3);
        assert!(page.has_next);
        assert!(page.has_previous);

        let last = Page::new(vec![5], PageRequest { page: 3, size: 2 }, 5);
        assert!(!last.has_next);
    }

    #[test]
    fn empty_listing_has_no_pages() {
        let page: Page<i32> = Page::new(Vec::new(), PageRequest { page: 1, size: 10 }, 0);
        assert_eq!(page.total_pages, 0);
        assert!(!page.has_next);
        assert!(!page.has_previous);
    }

    #[test]
    fn zero_page_and_oversized_page_are_rejected() {
        assert!(PageRequest { page: 0, size: 10 }.validate().is_err());
        assert!(PageRequest { page: 1, size: 0 }.validate().is_err());
        assert!(PageRequest { page: 1, size: MAX_PAGE_SIZE + 1 }.validate().is_err());
        assert!(PageRequest { page: 1, size: MAX_PAGE_SIZE }.validate().is_ok());
    }
}
