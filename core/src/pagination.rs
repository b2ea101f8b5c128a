//! Paged results.
//!
//! Only `total` is taken from the server. `pages`, `has_prev` and `has_next`
//! are recomputed here from `total` and the page that was asked for, so every
//! `PageResult` is internally consistent.

use tracing::debug;

use crate::types::Pagination;

#[derive(Debug, Clone, PartialEq)]
pub struct PageResult<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub pages: u32,
    pub has_prev: bool,
    pub has_next: bool,
    pub total: u64,
}

/// `ceil(total / per_page)`, or 0 when `per_page` is 0.
pub fn page_count(total: u64, per_page: u32) -> u32 {
    if per_page == 0 {
        return 0;
    }
    u32::try_from(total.div_ceil(u64::from(per_page))).unwrap_or(u32::MAX)
}

impl<T> PageResult<T> {
    pub fn new(items: Vec<T>, page: u32, per_page: u32, total: u64) -> Self {
        let pages = page_count(total, per_page);
        Self {
            items,
            page,
            per_page,
            pages,
            has_prev: page > 1,
            has_next: page < pages,
            total,
        }
    }

    /// Combine the items of a response with its pagination block. Without a
    /// block the response is treated as a single complete page. The server's
    /// `page` and `per_page` only fill in for a requested value of 0.
    pub(crate) fn from_server(
        items: Vec<T>,
        requested_page: u32,
        requested_per_page: u32,
        pagination: Option<Pagination>,
    ) -> Self {
        let Some(pagination) = pagination else {
            let total = items.len() as u64;
            return Self::new(items, requested_page, requested_per_page, total);
        };

        let page = if requested_page > 0 {
            requested_page
        } else {
            pagination.page
        };
        let per_page = match pagination.per_page {
            Some(served) if requested_per_page == 0 => served,
            _ => requested_per_page,
        };
        let result = Self::new(items, page, per_page, pagination.total);
        if pagination.page != page
            || pagination.pages != result.pages
            || pagination.has_next != result.has_next
        {
            debug!(
                server_page = pagination.page,
                server_pages = pagination.pages,
                computed_pages = result.pages,
                "server pagination disagrees with the request, using computed values"
            );
        }
        result
    }
}
