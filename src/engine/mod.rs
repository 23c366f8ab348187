//! Client-side query engine
//!
//! Given a full in-memory row set and a `QueryState`, produces the page a
//! server would have produced, without a remote round trip.
//!
//! # Invariants
//!
//! - Deterministic: same rows and query, same result
//! - `rows.len() == min(size, max(0, total - page*size))`
//! - Sorting is stable
//! - Adding filters never grows the filtered count

#[allow(clippy::module_inception)]
mod engine;
mod filters;
mod result;
mod search;
mod sorter;

pub use engine::ClientQueryEngine;
pub use filters::{is_date_field, FieldFilter};
pub use result::{expected_page_len, total_pages_for, PagedResult};
pub use search::GlobalSearch;
pub use sorter::RowSorter;
