//! Filter criteria
//!
//! A criterion is either a bare scalar (`"Active"`, `3`) or a structured
//! `{ "op": ..., "value": ... }` pair, matching the wire shape the table
//! component sends.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::errors::{QueryError, QueryResult};
use crate::row::CellValue;

/// Structured filter operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterOperator {
    #[serde(rename = "eq")]
    Eq,

    #[serde(rename = "neq")]
    Neq,

    /// Case-insensitive substring
    #[serde(rename = "contains")]
    Contains,

    #[serde(rename = "startsWith")]
    StartsWith,

    #[serde(rename = "endsWith")]
    EndsWith,

    #[serde(rename = "gt")]
    Gt,

    #[serde(rename = "gte")]
    Gte,

    #[serde(rename = "lt")]
    Lt,

    #[serde(rename = "lte")]
    Lte,
}

impl FilterOperator {
    /// Wire name of the operator
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::Eq => "eq",
            FilterOperator::Neq => "neq",
            FilterOperator::Contains => "contains",
            FilterOperator::StartsWith => "startsWith",
            FilterOperator::EndsWith => "endsWith",
            FilterOperator::Gt => "gt",
            FilterOperator::Gte => "gte",
            FilterOperator::Lt => "lt",
            FilterOperator::Lte => "lte",
        }
    }

    /// True for operators that only make sense on text
    pub fn is_textual(&self) -> bool {
        matches!(
            self,
            FilterOperator::Contains | FilterOperator::StartsWith | FilterOperator::EndsWith
        )
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FilterOperator {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "eq" => Ok(FilterOperator::Eq),
            "neq" => Ok(FilterOperator::Neq),
            "contains" => Ok(FilterOperator::Contains),
            "startsWith" => Ok(FilterOperator::StartsWith),
            "endsWith" => Ok(FilterOperator::EndsWith),
            "gt" => Ok(FilterOperator::Gt),
            "gte" => Ok(FilterOperator::Gte),
            "lt" => Ok(FilterOperator::Lt),
            "lte" => Ok(FilterOperator::Lte),
            other => Err(QueryError::UnknownOperator(other.to_string())),
        }
    }
}

/// A per-field filter criterion
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FilterCriterion {
    /// `{ "op": ..., "value": ... }`
    Structured { op: FilterOperator, value: CellValue },
    /// A bare value, matched as a case-insensitive substring
    Scalar(CellValue),
}

impl FilterCriterion {
    /// Creates a scalar criterion
    pub fn scalar(value: impl Into<CellValue>) -> Self {
        FilterCriterion::Scalar(value.into())
    }

    /// Creates a structured criterion
    pub fn structured(op: FilterOperator, value: impl Into<CellValue>) -> Self {
        FilterCriterion::Structured {
            op,
            value: value.into(),
        }
    }

    /// Returns the compared value
    pub fn value(&self) -> &CellValue {
        match self {
            FilterCriterion::Structured { value, .. } => value,
            FilterCriterion::Scalar(value) => value,
        }
    }

    /// Returns the operator, if structured
    pub fn operator(&self) -> Option<FilterOperator> {
        match self {
            FilterCriterion::Structured { op, .. } => Some(*op),
            FilterCriterion::Scalar(_) => None,
        }
    }

    /// A criterion is active when its value is present and not blank
    /// after trimming. Inactive criteria filter nothing.
    pub fn is_active(&self) -> bool {
        !self.value().is_blank()
    }

    /// The criterion value as trimmed text, if stringifiable
    pub fn text(&self) -> Option<String> {
        self.value().as_text().map(|s| s.trim().to_string())
    }

    /// Parses a criterion from its JSON wire form
    pub fn from_json(field: &str, raw: &Value) -> QueryResult<Self> {
        match raw {
            Value::Object(object) => {
                let op = object
                    .get("op")
                    .and_then(Value::as_str)
                    .ok_or_else(|| QueryError::InvalidFilter {
                        field: field.to_string(),
                        reason: "object criteria need a string 'op'".to_string(),
                    })?
                    .parse::<FilterOperator>()?;
                let value = object.get("value").cloned().unwrap_or(Value::Null);
                if value.is_object() || value.is_array() {
                    return Err(QueryError::InvalidFilter {
                        field: field.to_string(),
                        reason: "criterion value must be a scalar".to_string(),
                    });
                }
                Ok(FilterCriterion::Structured {
                    op,
                    value: CellValue::from(value),
                })
            }
            Value::Array(_) => Err(QueryError::InvalidFilter {
                field: field.to_string(),
                reason: "arrays are not supported".to_string(),
            }),
            scalar => Ok(FilterCriterion::Scalar(CellValue::from(scalar))),
        }
    }
}

impl<'de> Deserialize<'de> for FilterCriterion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        FilterCriterion::from_json("<filter>", &raw).map_err(serde::de::Error::custom)
    }
}

impl From<&str> for FilterCriterion {
    fn from(value: &str) -> Self {
        FilterCriterion::scalar(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_operator_roundtrip_names() {
        for name in ["eq", "neq", "contains", "startsWith", "endsWith", "gt", "gte", "lt", "lte"] {
            let op: FilterOperator = name.parse().unwrap();
            assert_eq!(op.as_str(), name);
        }
    }

    #[test]
    fn test_unknown_operator_rejected() {
        let result = FilterCriterion::from_json("age", &json!({"op": "between", "value": 3}));
        assert_eq!(result, Err(QueryError::UnknownOperator("between".to_string())));
    }

    #[test]
    fn test_parse_scalar_and_structured() {
        let scalar = FilterCriterion::from_json("status", &json!("Active")).unwrap();
        assert_eq!(scalar, FilterCriterion::scalar("Active"));

        let structured = FilterCriterion::from_json("age", &json!({"op": "gte", "value": 18})).unwrap();
        assert_eq!(structured.operator(), Some(FilterOperator::Gte));
        assert_eq!(structured.value(), &CellValue::Number(18.0));
    }

    #[test]
    fn test_blank_criteria_inactive() {
        assert!(!FilterCriterion::scalar("   ").is_active());
        assert!(!FilterCriterion::scalar(CellValue::Null).is_active());
        assert!(FilterCriterion::scalar(0i64).is_active());
    }

    #[test]
    fn test_serialize_wire_shape() {
        let structured = FilterCriterion::structured(FilterOperator::StartsWith, "Jo");
        assert_eq!(
            serde_json::to_value(&structured).unwrap(),
            json!({"op": "startsWith", "value": "Jo"})
        );
        assert_eq!(
            serde_json::to_value(FilterCriterion::scalar("x")).unwrap(),
            json!("x")
        );
    }

    #[test]
    fn test_array_criterion_rejected() {
        let result = FilterCriterion::from_json("tags", &json!(["a", "b"]));
        assert!(matches!(result, Err(QueryError::InvalidFilter { .. })));
    }
}
