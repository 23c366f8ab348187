//! Query state for table requests
//!
//! Describes which subset of rows a table wants: pagination, sort keys
//! (in priority order), a global search term and per-field filters.
//!
//! # Invariants
//!
//! - `size` is always positive
//! - Deep-equal states derive the same cache key, whatever order their
//!   filters were added in
//! - Any change to page, size, sorts, filters or search changes the key

mod errors;
mod filter;
mod state;

pub use errors::{QueryError, QueryResult};
pub use filter::{FilterCriterion, FilterOperator};
pub use state::{QueryState, SortDirection, SortSpec, DEFAULT_PAGE_SIZE};
