//! Global free-text search

use crate::row::Row;

/// Case-insensitive substring search across every field of a row
pub struct GlobalSearch;

impl GlobalSearch {
    /// Lower-cases a search term once, for repeated matching
    pub fn prepare(term: &str) -> String {
        term.to_lowercase()
    }

    /// Checks if any stringifiable field contains the prepared term.
    ///
    /// Null and nested cells never match.
    pub fn matches(row: &Row, prepared: &str) -> bool {
        row.fields().any(|(_, cell)| {
            cell.as_text()
                .is_some_and(|text| text.to_lowercase().contains(prepared))
        })
    }
}
