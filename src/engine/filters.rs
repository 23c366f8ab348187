//! Per-field filtering
//!
//! Filters are conjunctive. Fields whose name contains `date` compare by
//! calendar date; everything else compares as text unless a structured
//! operator asks for an ordering.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::query::{FilterCriterion, FilterOperator};
use crate::row::{parse_date, CellValue, Row};

/// Evaluates filter criteria against rows
pub struct FieldFilter;

impl FieldFilter {
    /// Checks if a row passes every active criterion (AND semantics)
    pub fn matches(row: &Row, filters: &BTreeMap<String, FilterCriterion>) -> bool {
        filters
            .iter()
            .filter(|(_, criterion)| criterion.is_active())
            .all(|(field, criterion)| Self::matches_criterion(row, field, criterion))
    }

    /// Checks a single criterion. Missing and null cells never match.
    pub fn matches_criterion(row: &Row, field: &str, criterion: &FilterCriterion) -> bool {
        let cell = match row.get(field) {
            Some(cell) if !cell.is_null() => cell,
            _ => return false,
        };

        if is_date_field(field) {
            return Self::date_match(cell, criterion);
        }

        match criterion {
            FilterCriterion::Scalar(_) => Self::text_op(cell, criterion, FilterOperator::Contains),
            FilterCriterion::Structured { op, value } => match op {
                FilterOperator::Contains | FilterOperator::StartsWith | FilterOperator::EndsWith => {
                    Self::text_op(cell, criterion, *op)
                }
                FilterOperator::Eq => Self::eq_match(cell, value),
                FilterOperator::Neq => !Self::eq_match(cell, value),
                FilterOperator::Gt => Self::ordered(cell, value, |o| o == Ordering::Greater),
                FilterOperator::Gte => Self::ordered(cell, value, |o| o != Ordering::Less),
                FilterOperator::Lt => Self::ordered(cell, value, |o| o == Ordering::Less),
                FilterOperator::Lte => Self::ordered(cell, value, |o| o != Ordering::Greater),
            },
        }
    }

    /// Calendar-date comparison. Unparseable dates on either side exclude.
    fn date_match(cell: &CellValue, criterion: &FilterCriterion) -> bool {
        let (Some(actual), Some(expected)) = (cell.calendar_date(), criterion.value().calendar_date())
        else {
            return false;
        };

        let ordering = actual.cmp(&expected);
        match criterion.operator() {
            None | Some(FilterOperator::Eq) => ordering == Ordering::Equal,
            // Text operators have no meaning on a date; treat as equality
            Some(op) if op.is_textual() => ordering == Ordering::Equal,
            Some(FilterOperator::Neq) => ordering != Ordering::Equal,
            Some(FilterOperator::Gt) => ordering == Ordering::Greater,
            Some(FilterOperator::Gte) => ordering != Ordering::Less,
            Some(FilterOperator::Lt) => ordering == Ordering::Less,
            Some(FilterOperator::Lte) => ordering != Ordering::Greater,
            Some(_) => false,
        }
    }

    /// Case-insensitive text operator on the stringified cell
    fn text_op(cell: &CellValue, criterion: &FilterCriterion, op: FilterOperator) -> bool {
        let (Some(actual), Some(needle)) = (cell.as_text(), criterion.text()) else {
            return false;
        };
        let actual = actual.to_lowercase();
        let needle = needle.to_lowercase();

        match op {
            FilterOperator::StartsWith => actual.starts_with(&needle),
            FilterOperator::EndsWith => actual.ends_with(&needle),
            _ => actual.contains(&needle),
        }
    }

    /// Exact for numbers and booleans, case-insensitive for text
    fn eq_match(cell: &CellValue, expected: &CellValue) -> bool {
        match cell {
            CellValue::Number(actual) => expected.as_number() == Some(*actual),
            CellValue::Bool(actual) => match expected {
                CellValue::Bool(b) => actual == b,
                other => other
                    .as_text()
                    .is_some_and(|t| t.trim().eq_ignore_ascii_case(&actual.to_string())),
            },
            _ => match (cell.as_text(), expected.as_text()) {
                (Some(a), Some(b)) => a.to_lowercase() == b.trim().to_lowercase(),
                _ => false,
            },
        }
    }

    /// Ordering comparison; incomparable kinds exclude the row
    fn ordered(cell: &CellValue, bound: &CellValue, accept: impl Fn(Ordering) -> bool) -> bool {
        compare_to_bound(cell, bound).is_some_and(accept)
    }
}

/// True when the field name contains `date`, any case
pub fn is_date_field(field: &str) -> bool {
    field.to_ascii_lowercase().contains("date")
}

fn compare_to_bound(cell: &CellValue, bound: &CellValue) -> Option<Ordering> {
    match cell {
        CellValue::Number(a) => bound.as_number().and_then(|b| a.partial_cmp(&b)),
        CellValue::Date(a) => match bound {
            CellValue::Date(b) => Some(a.cmp(b)),
            CellValue::Text(s) => parse_date(s).map(|b| a.cmp(&b)),
            _ => None,
        },
        CellValue::Bool(a) => match bound {
            CellValue::Bool(b) => Some(a.cmp(b)),
            _ => None,
        },
        CellValue::Text(a) => match (cell.as_number(), bound.as_number()) {
            (Some(x), Some(y)) => x.partial_cmp(&y),
            _ => bound.as_text().map(|b| a.as_str().cmp(b.as_str())),
        },
        CellValue::Null | CellValue::Json(_) => None,
    }
}
