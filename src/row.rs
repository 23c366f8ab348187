//! Row model for table data
//!
//! Rows are opaque beyond their `id`. Cell values are a closed set of
//! kinds so that search, filtering and sorting have one meaning per kind.
//!
//! # Cross-kind ordering
//!
//! Null < Bool < Number < Date < Text < Json

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// Field name holding the row key
pub const ID_FIELD: &str = "id";

/// A single typed cell value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum CellValue {
    /// Explicit null / absent value
    Null,
    /// Boolean
    Bool(bool),
    /// Any numeric value
    Number(f64),
    /// Free text, including date-like strings from remote payloads
    Text(String),
    /// A date or timestamp
    Date(NaiveDateTime),
    /// Nested object or array, opaque to the engine
    Json(Value),
}

impl CellValue {
    /// Creates a text cell
    pub fn text(value: impl Into<String>) -> Self {
        CellValue::Text(value.into())
    }

    /// Creates a date cell at midnight
    pub fn date(date: NaiveDate) -> Self {
        CellValue::Date(date.and_time(NaiveTime::MIN))
    }

    /// Returns true for `Null`
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Converts the cell to text.
    ///
    /// `Null` and `Json` cells are not stringifiable and return `None`.
    pub fn as_text(&self) -> Option<String> {
        match self {
            CellValue::Null | CellValue::Json(_) => None,
            CellValue::Bool(b) => Some(b.to_string()),
            CellValue::Number(n) => Some(format_number(*n)),
            CellValue::Text(s) => Some(s.clone()),
            CellValue::Date(d) => Some(format_date(d)),
        }
    }

    /// Returns true if the cell has no text or only whitespace
    pub fn is_blank(&self) -> bool {
        self.as_text().map_or(true, |s| s.trim().is_empty())
    }

    /// Returns the numeric value, parsing text when it holds a number
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            CellValue::Text(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    /// Returns the calendar date of this cell, ignoring time-of-day.
    ///
    /// Text is parsed with [`parse_date`]; numbers are epoch milliseconds.
    pub fn calendar_date(&self) -> Option<NaiveDate> {
        match self {
            CellValue::Date(d) => Some(d.date()),
            CellValue::Text(s) => parse_date(s).map(|d| d.date()),
            CellValue::Number(n) if n.is_finite() => {
                DateTime::<Utc>::from_timestamp_millis(*n as i64).map(|d| d.date_naive())
            }
            _ => None,
        }
    }

    fn kind_rank(&self) -> u8 {
        match self {
            CellValue::Null => 0,
            CellValue::Bool(_) => 1,
            CellValue::Number(_) => 2,
            CellValue::Date(_) => 3,
            CellValue::Text(_) => 4,
            CellValue::Json(_) => 5,
        }
    }

    /// Natural ordering: by kind first, then by value within a kind
    pub fn natural_cmp(&self, other: &CellValue) -> Ordering {
        let by_kind = self.kind_rank().cmp(&other.kind_rank());
        if by_kind != Ordering::Equal {
            return by_kind;
        }

        match (self, other) {
            (CellValue::Bool(a), CellValue::Bool(b)) => a.cmp(b),
            (CellValue::Number(a), CellValue::Number(b)) => {
                a.partial_cmp(b).unwrap_or(Ordering::Equal)
            }
            (CellValue::Text(a), CellValue::Text(b)) => a.cmp(b),
            (CellValue::Date(a), CellValue::Date(b)) => a.cmp(b),
            // Null vs Null, Json vs Json
            _ => Ordering::Equal,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_text() {
            Some(text) => write!(f, "{}", text),
            None => write!(f, "{}", Value::from(self.clone())),
        }
    }
}

impl From<Value> for CellValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => CellValue::Null,
            Value::Bool(b) => CellValue::Bool(b),
            Value::Number(n) => n.as_f64().map_or(CellValue::Null, CellValue::Number),
            Value::String(s) => CellValue::Text(s),
            other => CellValue::Json(other),
        }
    }
}

impl From<&Value> for CellValue {
    fn from(value: &Value) -> Self {
        CellValue::from(value.clone())
    }
}

impl From<CellValue> for Value {
    fn from(cell: CellValue) -> Self {
        match cell {
            CellValue::Null => Value::Null,
            CellValue::Bool(b) => Value::Bool(b),
            CellValue::Number(n) => number_to_json(n),
            CellValue::Text(s) => Value::String(s),
            CellValue::Date(d) => Value::String(format_date(&d)),
            CellValue::Json(v) => v,
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Bool(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Number(value as f64)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<NaiveDateTime> for CellValue {
    fn from(value: NaiveDateTime) -> Self {
        CellValue::Date(value)
    }
}

/// Integral numbers print without a fractional part ("3", not "3.0")
fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 9.0e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

fn number_to_json(n: f64) -> Value {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 9.0e15 {
        return Value::Number(Number::from(n as i64));
    }
    Number::from_f64(n).map_or(Value::Null, Value::Number)
}

fn format_date(d: &NaiveDateTime) -> String {
    if d.time() == NaiveTime::MIN {
        d.format("%Y-%m-%d").to_string()
    } else {
        d.format("%Y-%m-%dT%H:%M:%S").to_string()
    }
}

/// Parses a date-like string.
///
/// Accepts RFC 3339 timestamps (the date as written, not shifted to UTC),
/// naive ISO timestamps and a few common calendar-date layouts.
pub fn parse_date(input: &str) -> Option<NaiveDateTime> {
    let s = input.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }

    const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"];
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }

    const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .map(|d| d.and_time(NaiveTime::MIN))
}

/// A table row.
///
/// `fields` always carries the `id` cell as well, with its original kind,
/// so that searching and sorting by `id` see the same value the source sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct Row {
    id: String,
    fields: BTreeMap<String, CellValue>,
}

impl Row {
    /// Creates a row holding only its id
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        let mut fields = BTreeMap::new();
        fields.insert(ID_FIELD.to_string(), CellValue::Text(id.clone()));
        Self { id, fields }
    }

    /// Builds a row from a JSON object and an already-resolved id.
    ///
    /// An existing `id` member keeps its original kind; otherwise the
    /// resolved id is inserted as text.
    pub fn from_object(id: impl Into<String>, object: &Map<String, Value>) -> Self {
        let id = id.into();
        let mut fields: BTreeMap<String, CellValue> = object
            .iter()
            .map(|(k, v)| (k.clone(), CellValue::from(v)))
            .collect();

        let keep_natural = fields
            .get(ID_FIELD)
            .and_then(CellValue::as_text)
            .is_some_and(|natural| natural == id);
        if !keep_natural {
            fields.insert(ID_FIELD.to_string(), CellValue::Text(id.clone()));
        }

        Self { id, fields }
    }

    /// Adds or replaces a field (builder style). The `id` field cannot be
    /// replaced this way.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<CellValue>) -> Self {
        self.set(field, value);
        self
    }

    /// Adds or replaces a field. Writes to `id` are ignored.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<CellValue>) {
        let field = field.into();
        if field == ID_FIELD {
            return;
        }
        self.fields.insert(field, value.into());
    }

    /// Returns the row key
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns a field value
    pub fn get(&self, field: &str) -> Option<&CellValue> {
        self.fields.get(field)
    }

    /// Iterates all fields, including `id`
    pub fn fields(&self) -> impl Iterator<Item = (&str, &CellValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of fields, including `id`
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Converts text cells to the kind declared by their column.
    ///
    /// Cells that do not parse as the declared kind are left untouched.
    pub fn coerce_kinds(&mut self, columns: &[ColumnDescriptor]) {
        for column in columns {
            let Some(kind) = column.value_kind else {
                continue;
            };
            let Some(cell) = self.fields.get_mut(&column.key) else {
                continue;
            };
            let CellValue::Text(text) = cell else {
                continue;
            };

            let coerced = match kind {
                ValueKind::Date => parse_date(text).map(CellValue::Date),
                ValueKind::Number => text.trim().parse::<f64>().ok().map(CellValue::Number),
                ValueKind::Boolean => match text.trim().to_ascii_lowercase().as_str() {
                    "true" => Some(CellValue::Bool(true)),
                    "false" => Some(CellValue::Bool(false)),
                    _ => None,
                },
                ValueKind::Text => None,
            };

            if let Some(value) = coerced {
                *cell = value;
            }
        }
    }
}

impl TryFrom<Value> for Row {
    type Error = String;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let Value::Object(object) = value else {
            return Err("row must be a JSON object".to_string());
        };
        let id = match object.get(ID_FIELD) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => return Err("row is missing a string or numeric id".to_string()),
        };
        Ok(Row::from_object(id, &object))
    }
}

impl From<Row> for Value {
    fn from(row: Row) -> Self {
        let mut object: Map<String, Value> = row
            .fields
            .into_iter()
            .map(|(k, v)| (k, Value::from(v)))
            .collect();
        object
            .entry(ID_FIELD.to_string())
            .or_insert(Value::String(row.id));
        Value::Object(object)
    }
}

/// Declared kind of a column's values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Text,
    Number,
    Date,
    Boolean,
}

/// Column metadata consumed by the core.
///
/// Only `key` is used to index into rows; the rest is advisory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub key: String,
    #[serde(default = "default_true")]
    pub sortable: bool,
    #[serde(default = "default_true")]
    pub filterable: bool,
    #[serde(default, rename = "valueKind")]
    pub value_kind: Option<ValueKind>,
}

fn default_true() -> bool {
    true
}

impl ColumnDescriptor {
    /// Creates a sortable, filterable column with no declared kind
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            sortable: true,
            filterable: true,
            value_kind: None,
        }
    }

    /// Sets the declared value kind
    pub fn of_kind(mut self, kind: ValueKind) -> Self {
        self.value_kind = Some(kind);
        self
    }
}
