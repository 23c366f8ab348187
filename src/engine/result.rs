//! Paged result type

use serde::{Deserialize, Serialize};

use crate::row::Row;

/// One page of rows plus the totals a table needs to render a paginator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedResult {
    /// Rows in result order, at most `size`
    pub rows: Vec<Row>,
    /// Count after filtering, before slicing
    pub total: usize,
    pub page: usize,
    pub size: usize,
    /// `ceil(total / size)`
    pub total_pages: usize,
}

impl PagedResult {
    pub fn new(rows: Vec<Row>, total: usize, page: usize, size: usize) -> Self {
        Self {
            rows,
            total,
            page,
            size,
            total_pages: total_pages_for(total, size),
        }
    }

    /// No rows, zero total, for the requested window
    pub fn empty(page: usize, size: usize) -> Self {
        Self::new(Vec::new(), 0, page, size)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Ids of the rows on this page, in order
    pub fn ids(&self) -> Vec<&str> {
        self.rows.iter().map(Row::id).collect()
    }
}

/// `ceil(total / size)`, zero when `size` is zero
pub fn total_pages_for(total: usize, size: usize) -> usize {
    if size == 0 {
        return 0;
    }
    total.div_ceil(size)
}

/// Length of the `[page*size, page*size+size)` window over `total` rows
pub fn expected_page_len(total: usize, page: usize, size: usize) -> usize {
    let offset = page.saturating_mul(size);
    size.min(total.saturating_sub(offset))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_total_pages() {
        assert_eq!(total_pages_for(0, 10), 0);
        assert_eq!(total_pages_for(10, 10), 1);
        assert_eq!(total_pages_for(25, 10), 3);
    }

    #[test]
    fn test_expected_page_len() {
        assert_eq!(expected_page_len(25, 0, 10), 10);
        assert_eq!(expected_page_len(25, 2, 10), 5);
        assert_eq!(expected_page_len(25, 3, 10), 0);
        assert_eq!(expected_page_len(25, usize::MAX, 10), 0);
    }

    #[test]
    fn test_serializes_camel_case() {
        let result = PagedResult::empty(2, 5);
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({"rows": [], "total": 0, "page": 2, "size": 5, "totalPages": 0})
        );
    }
}
