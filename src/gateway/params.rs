//! Server-mode request parameters
//!
//! Fixed order: `page`, `size`, `global`?, `sort`?, then one entry per
//! filter in field-name order. Structured criteria produce
//! `filter[f][op]` and `filter[f][value]`; scalars produce `filter[f]`.

use crate::query::{FilterCriterion, QueryState};

use super::source::{DataSource, ExecutionMode};

/// HTTP-style GET descriptor handed to the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportRequest {
    pub url: String,
    pub query_params: Vec<(String, String)>,
}

impl TransportRequest {
    /// Request carrying the encoded query
    pub fn server(url: impl Into<String>, query: &QueryState) -> Self {
        Self {
            url: url.into(),
            query_params: query_params(query),
        }
    }

    /// Request for a whole dataset; no parameters
    pub fn bulk(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            query_params: Vec::new(),
        }
    }

    /// Builds the request `source` needs for `query`
    pub fn for_source(source: &DataSource, api_base_url: &str, query: &QueryState) -> Self {
        let url = source.url(api_base_url);
        match source.mode() {
            ExecutionMode::Server => Self::server(url, query),
            ExecutionMode::Client => Self::bulk(url),
        }
    }

    /// Value of the first parameter named `name`
    pub fn param(&self, name: &str) -> Option<&str> {
        self.query_params
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Human-readable URL, parameters unencoded
    pub fn display_url(&self) -> String {
        if self.query_params.is_empty() {
            return self.url.clone();
        }
        let query: Vec<String> = self
            .query_params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        format!("{}?{}", self.url, query.join("&"))
    }
}

/// Encodes `query` as ordered key/value pairs
pub fn query_params(query: &QueryState) -> Vec<(String, String)> {
    let mut params = vec![
        ("page".to_string(), query.page().to_string()),
        ("size".to_string(), query.size().to_string()),
    ];

    if let Some(global) = query.global() {
        params.push(("global".to_string(), global.to_string()));
    }

    if !query.sorts().is_empty() {
        let sort: Vec<String> = query.sorts().iter().map(|s| s.to_string()).collect();
        params.push(("sort".to_string(), sort.join(",")));
    }

    for (field, criterion) in query.filters() {
        match criterion {
            FilterCriterion::Structured { op, value } => {
                params.push((format!("filter[{}][op]", field), op.to_string()));
                params.push((format!("filter[{}][value]", field), value.to_string()));
            }
            FilterCriterion::Scalar(value) => {
                params.push((format!("filter[{}]", field), value.to_string()));
            }
        }
    }

    params
}
