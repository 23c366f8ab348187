//! Query state
//!
//! `QueryState` is an immutable value: every change produces a new state.
//! Filters live in a `BTreeMap`, so the serialized form (and therefore the
//! cache key) does not depend on the order filters were added in.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::{QueryError, QueryResult};
use super::filter::FilterCriterion;

/// Default page size used by `reset`
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

impl FromStr for SortDirection {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            other => Err(QueryError::InvalidSort(format!(
                "Invalid sort direction: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One sort key. Position in `QueryState::sorts` is its priority.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: String,
    #[serde(rename = "dir")]
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }

    pub fn asc(field: impl Into<String>) -> Self {
        Self::new(field, SortDirection::Asc)
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self::new(field, SortDirection::Desc)
    }

    /// Parses `field:dir`; a bare `field` sorts ascending
    pub fn parse(value: &str) -> QueryResult<Self> {
        let value = value.trim();
        let (field, direction) = match value.rsplit_once(':') {
            Some((field, dir)) => (field.trim(), dir.trim().parse()?),
            None => (value, SortDirection::Asc),
        };
        if field.is_empty() {
            return Err(QueryError::InvalidSort(format!(
                "Missing sort field in '{}'",
                value
            )));
        }
        Ok(Self::new(field, direction))
    }
}

impl fmt::Display for SortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.field, self.direction)
    }
}

/// Canonical description of the wanted subset of rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "QueryStateWire")]
pub struct QueryState {
    page: usize,
    size: usize,
    sorts: Vec<SortSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    global: Option<String>,
    filters: BTreeMap<String, FilterCriterion>,
}

/// Unvalidated wire form
#[derive(Deserialize)]
struct QueryStateWire {
    #[serde(default)]
    page: usize,
    size: usize,
    #[serde(default)]
    sorts: Vec<SortSpec>,
    #[serde(default)]
    global: Option<String>,
    #[serde(default)]
    filters: BTreeMap<String, Value>,
}

impl TryFrom<QueryStateWire> for QueryState {
    type Error = QueryError;

    fn try_from(wire: QueryStateWire) -> Result<Self, Self::Error> {
        let mut state = QueryState::new(wire.page, wire.size)?;
        for sort in wire.sorts {
            state = state.sorted_by(sort);
        }
        for (field, raw) in &wire.filters {
            let criterion = FilterCriterion::from_json(field, raw)?;
            state = state.filtered_by(field.as_str(), criterion);
        }
        if let Some(term) = wire.global {
            state = state.searching(term);
        }
        Ok(state)
    }
}

impl QueryState {
    /// Creates a state with no sorts, filters or search.
    ///
    /// Fails when `size` is zero.
    pub fn new(page: usize, size: usize) -> QueryResult<Self> {
        if size == 0 {
            return Err(QueryError::InvalidSize(size));
        }
        Ok(Self {
            page,
            size,
            sorts: Vec::new(),
            global: None,
            filters: BTreeMap::new(),
        })
    }

    /// First page with the given size
    pub fn first_page(size: usize) -> QueryResult<Self> {
        Self::new(0, size)
    }

    // ------------------------------------------------------------------
    // Construction (does not touch the page)
    // ------------------------------------------------------------------

    /// Appends a sort key at the lowest priority, replacing any earlier key
    /// on the same field
    pub fn sorted_by(mut self, sort: SortSpec) -> Self {
        self.sorts.retain(|s| s.field != sort.field);
        self.sorts.push(sort);
        self
    }

    /// Sets a filter. Inactive (blank) criteria remove the field instead.
    pub fn filtered_by(mut self, field: impl Into<String>, criterion: impl Into<FilterCriterion>) -> Self {
        let field = field.into();
        let criterion = criterion.into();
        if criterion.is_active() {
            self.filters.insert(field, criterion);
        } else {
            self.filters.remove(&field);
        }
        self
    }

    /// Sets the global search term. Blank terms clear it.
    pub fn searching(mut self, term: impl Into<String>) -> Self {
        let term = term.into();
        self.global = if term.trim().is_empty() {
            None
        } else {
            Some(term)
        };
        self
    }

    // ------------------------------------------------------------------
    // Transitions (UI operations)
    // ------------------------------------------------------------------

    /// Moves to another page and/or page size
    pub fn with_page(&self, page: usize, size: usize) -> QueryResult<Self> {
        if size == 0 {
            return Err(QueryError::InvalidSize(size));
        }
        Ok(Self {
            page,
            size,
            ..self.clone()
        })
    }

    /// Sorts by `field`, moving it to the lowest priority. Back to page 0.
    pub fn with_sort(&self, field: impl Into<String>, direction: SortDirection) -> Self {
        let mut next = self.clone().sorted_by(SortSpec::new(field, direction));
        next.page = 0;
        next
    }

    /// Drops the sort on `field`. Back to page 0.
    pub fn without_sort(&self, field: &str) -> Self {
        let mut next = self.clone();
        next.sorts.retain(|s| s.field != field);
        next.page = 0;
        next
    }

    /// Sets or clears a filter. Back to page 0.
    pub fn with_filter(&self, field: impl Into<String>, criterion: Option<FilterCriterion>) -> Self {
        let field = field.into();
        let mut next = match criterion {
            Some(criterion) => self.clone().filtered_by(field, criterion),
            None => {
                let mut next = self.clone();
                next.filters.remove(&field);
                next
            }
        };
        next.page = 0;
        next
    }

    /// Sets the global search term. Back to page 0.
    pub fn with_global(&self, term: impl Into<String>) -> Self {
        let mut next = self.clone().searching(term);
        next.page = 0;
        next
    }

    /// Clears sorts, filters and search, keeping the page size
    pub fn reset(&self) -> Self {
        Self {
            page: 0,
            size: self.size,
            sorts: Vec::new(),
            global: None,
            filters: BTreeMap::new(),
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn sorts(&self) -> &[SortSpec] {
        &self.sorts
    }

    pub fn global(&self) -> Option<&str> {
        self.global.as_deref()
    }

    pub fn filters(&self) -> &BTreeMap<String, FilterCriterion> {
        &self.filters
    }

    /// Index of the first row on this page
    pub fn offset(&self) -> usize {
        self.page.saturating_mul(self.size)
    }

    /// Canonical JSON form of this state
    pub fn canonical_json(&self) -> String {
        // Serialization of this type cannot fail: keys are strings and
        // non-finite numbers already map to null.
        serde_json::to_string(self).unwrap_or_else(|_| format!("{:?}", self))
    }

    /// Cache key for this state against `endpoint`
    pub fn cache_key(&self, endpoint: &str) -> String {
        format!("{}:{}", endpoint, self.canonical_json())
    }
}

impl Default for QueryState {
    fn default() -> Self {
        Self {
            page: 0,
            size: DEFAULT_PAGE_SIZE,
            sorts: Vec::new(),
            global: None,
            filters: BTreeMap::new(),
        }
    }
}
