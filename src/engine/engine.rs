//! Client-side query engine
//!
//! Reproduces, in memory, the filter -> sort -> paginate contract a
//! compliant server applies, so both execution paths return the same
//! `PagedResult`.

use crate::query::QueryState;
use crate::row::Row;

use super::filters::FieldFilter;
use super::result::PagedResult;
use super::search::GlobalSearch;
use super::sorter::RowSorter;

/// Stateless executor over a full in-memory row set
#[derive(Debug, Default, Clone, Copy)]
pub struct ClientQueryEngine;

impl ClientQueryEngine {
    pub fn new() -> Self {
        Self
    }

    /// Executes `query` over `rows`.
    ///
    /// # Execution Flow (strict order)
    ///
    /// 1. Global search
    /// 2. Per-field filters
    /// 3. Stable multi-key sort
    /// 4. Slice `[page*size, page*size+size)`; `total` is the count before slicing
    pub fn execute(&self, rows: &[Row], query: &QueryState) -> PagedResult {
        let mut matched = self.filter(rows, query);
        RowSorter::sort(&mut matched, query.sorts());

        let total = matched.len();
        let page_rows: Vec<Row> = matched
            .into_iter()
            .skip(query.offset())
            .take(query.size())
            .cloned()
            .collect();

        PagedResult::new(page_rows, total, query.page(), query.size())
    }

    /// Number of rows surviving search and filters
    pub fn filtered_count(&self, rows: &[Row], query: &QueryState) -> usize {
        self.filter(rows, query).len()
    }

    /// Rows surviving search and filters, in input order
    pub fn filter<'a>(&self, rows: &'a [Row], query: &QueryState) -> Vec<&'a Row> {
        let term = query.global().map(GlobalSearch::prepare);

        rows.iter()
            .filter(|row| match &term {
                Some(term) => GlobalSearch::matches(row, term),
                None => true,
            })
            .filter(|row| FieldFilter::matches(row, query.filters()))
            .collect()
    }
}
