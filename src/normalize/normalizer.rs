//! Response normalizer
//!
//! Turns remote payloads into `PagedResult`s. Recognized shapes:
//!
//! 1. Bare array: a bulk source. Sliced to the requested window; `total`
//!    is the array length.
//! 2. Envelope `{ data: [...], total: n, page?, size?, totalPages? }`:
//!    passed through, missing members defaulted from the request.
//! 3. Anything else: malformed. Empty page plus a warning.

use serde_json::{Map, Value};

use crate::engine::{total_pages_for, ClientQueryEngine, PagedResult};
use crate::gateway::ExecutionMode;
use crate::observability::{Event, Logger};
use crate::query::QueryState;
use crate::row::{ColumnDescriptor, Row, ID_FIELD};

use super::errors::NormalizeError;

/// Longest payload excerpt written to a warning
const PAYLOAD_PREVIEW_CHARS: usize = 200;

/// Field wrapping non-object array items
pub const SCALAR_ITEM_FIELD: &str = "value";

/// Normalization output. A warning never comes with rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub result: PagedResult,
    pub warning: Option<NormalizeError>,
}

impl Normalized {
    fn ok(result: PagedResult) -> Self {
        Self {
            result,
            warning: None,
        }
    }
}

/// Converts heterogeneous payloads into pages and datasets
#[derive(Debug, Clone)]
pub struct ResponseNormalizer {
    id_fallback_fields: Vec<String>,
    columns: Vec<ColumnDescriptor>,
    engine: ClientQueryEngine,
    logger: Logger,
}

impl ResponseNormalizer {
    /// `id_fallback_fields` are tried, in order, when an item has no `id`
    pub fn new(id_fallback_fields: Vec<String>, logger: Logger) -> Self {
        Self {
            id_fallback_fields,
            columns: Vec::new(),
            engine: ClientQueryEngine::new(),
            logger,
        }
    }

    /// Coerces cells to the kinds these columns declare
    pub fn with_columns(mut self, columns: Vec<ColumnDescriptor>) -> Self {
        self.columns = columns;
        self
    }

    /// Normalizes `payload` for `query`.
    ///
    /// In client mode the payload is the whole universe and the engine
    /// derives the page from it.
    pub fn normalize(&self, payload: &Value, query: &QueryState, mode: ExecutionMode) -> Normalized {
        let outcome = match mode {
            ExecutionMode::Server => self.server_page(payload, query),
            ExecutionMode::Client => self
                .dataset(payload)
                .map(|rows| self.engine.execute(&rows, query)),
        };

        match outcome {
            Ok(result) => Normalized::ok(result),
            Err(err) => {
                self.warn_malformed(payload, &err);
                Normalized {
                    result: PagedResult::empty(query.page(), query.size()),
                    warning: Some(err),
                }
            }
        }
    }

    /// Reads the full row set of a bulk payload (array or envelope data).
    ///
    /// Synthetic ids use the index in the full dataset.
    pub fn dataset(&self, payload: &Value) -> Result<Vec<Row>, NormalizeError> {
        let items = match payload {
            Value::Array(items) => items,
            Value::Object(object) => envelope_parts(object)?.0,
            other => return Err(unexpected(other)),
        };

        Ok(items
            .iter()
            .enumerate()
            .map(|(index, item)| self.row_from_item(item, index))
            .collect())
    }

    /// Builds a row from one payload item.
    ///
    /// The id is the item's own `id`, then the first fallback field present,
    /// then `row-<index>`. Non-object items are wrapped as `{ value: item }`.
    pub fn row_from_item(&self, item: &Value, index: usize) -> Row {
        let mut row = match item {
            Value::Object(object) => {
                let id = self
                    .natural_id(object)
                    .unwrap_or_else(|| synthetic_id(index));
                Row::from_object(id, object)
            }
            scalar => Row::new(synthetic_id(index)).with(SCALAR_ITEM_FIELD, scalar),
        };

        if !self.columns.is_empty() {
            row.coerce_kinds(&self.columns);
        }
        row
    }

    /// Logs a malformed payload at WARN
    pub fn warn_malformed(&self, payload: &Value, err: &NormalizeError) {
        let preview: String = payload.to_string().chars().take(PAYLOAD_PREVIEW_CHARS).collect();
        let message = err.to_string();
        self.logger.warn(
            Event::MalformedResponse,
            &[
                ("code", err.code()),
                ("message", message.as_str()),
                ("payload", preview.as_str()),
            ],
        );
    }

    fn server_page(&self, payload: &Value, query: &QueryState) -> Result<PagedResult, NormalizeError> {
        match payload {
            Value::Array(items) => {
                let offset = query.offset();
                let rows = items
                    .iter()
                    .enumerate()
                    .skip(offset)
                    .take(query.size())
                    .map(|(index, item)| self.row_from_item(item, index))
                    .collect();
                Ok(PagedResult::new(rows, items.len(), query.page(), query.size()))
            }
            Value::Object(object) => self.envelope_page(object, query),
            other => Err(unexpected(other)),
        }
    }

    fn envelope_page(
        &self,
        object: &Map<String, Value>,
        query: &QueryState,
    ) -> Result<PagedResult, NormalizeError> {
        let (data, total) = envelope_parts(object)?;

        let page = object.get("page").and_then(as_count).unwrap_or(query.page());
        let size = object
            .get("size")
            .and_then(as_count)
            .filter(|size| *size > 0)
            .unwrap_or(query.size());
        let total_pages = object
            .get("totalPages")
            .and_then(as_count)
            .unwrap_or_else(|| total_pages_for(total, size));

        let offset = page.saturating_mul(size);
        let rows = data
            .iter()
            .enumerate()
            .map(|(index, item)| self.row_from_item(item, offset.saturating_add(index)))
            .collect();

        Ok(PagedResult {
            rows,
            total,
            page,
            size,
            total_pages,
        })
    }

    fn natural_id(&self, object: &Map<String, Value>) -> Option<String> {
        std::iter::once(ID_FIELD)
            .chain(self.id_fallback_fields.iter().map(String::as_str))
            .find_map(|field| match object.get(field) {
                Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
                Some(Value::Number(n)) => Some(n.to_string()),
                _ => None,
            })
    }
}

fn synthetic_id(index: usize) -> String {
    format!("row-{}", index)
}

/// Splits an envelope into its `data` array and `total`
fn envelope_parts(object: &Map<String, Value>) -> Result<(&Vec<Value>, usize), NormalizeError> {
    let (Some(data), Some(total)) = (object.get("data"), object.get("total")) else {
        return Err(NormalizeError::UnexpectedShape {
            found: "object without 'data' and 'total'".to_string(),
        });
    };

    let data = data.as_array().ok_or_else(|| NormalizeError::InvalidEnvelope {
        reason: "'data' must be an array".to_string(),
    })?;
    let total = as_count(total).ok_or_else(|| NormalizeError::InvalidEnvelope {
        reason: "'total' must be a non-negative integer".to_string(),
    })?;

    Ok((data, total))
}

fn as_count(value: &Value) -> Option<usize> {
    value.as_u64().and_then(|n| usize::try_from(n).ok())
}

fn unexpected(value: &Value) -> NormalizeError {
    let found = match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    };
    NormalizeError::UnexpectedShape {
        found: found.to_string(),
    }
}
