//! Multi-key row sorting
//!
//! Sorts by every key in priority order, deterministically.

use std::borrow::Borrow;
use std::cmp::Ordering;

use crate::query::{SortDirection, SortSpec};
use crate::row::{CellValue, Row};

/// Sorts rows by a list of sort keys
pub struct RowSorter;

impl RowSorter {
    /// Sorts rows according to `sorts`, first key highest priority.
    ///
    /// Sort is stable: rows equal under every key keep their input order.
    pub fn sort<R: Borrow<Row>>(rows: &mut [R], sorts: &[SortSpec]) {
        if sorts.is_empty() {
            return;
        }
        rows.sort_by(|a, b| Self::compare_rows(a.borrow(), b.borrow(), sorts));
    }

    /// Compares two rows key by key until one key breaks the tie
    pub fn compare_rows(a: &Row, b: &Row, sorts: &[SortSpec]) -> Ordering {
        for sort in sorts {
            let ordering = Self::compare_values(a.get(&sort.field), b.get(&sort.field));
            let ordering = match sort.direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }

    /// Missing cells sort as null
    fn compare_values(a: Option<&CellValue>, b: Option<&CellValue>) -> Ordering {
        let a = a.unwrap_or(&CellValue::Null);
        let b = b.unwrap_or(&CellValue::Null);
        a.natural_cmp(b)
    }
}
