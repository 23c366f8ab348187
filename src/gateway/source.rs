//! Data sources and execution modes

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::query::QueryState;

/// Where filtering, sorting and pagination run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// Query encoded into request parameters; the remote side pages
    Server,
    /// Full dataset fetched once; the engine pages locally
    Client,
}

impl ExecutionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionMode::Server => "server",
            ExecutionMode::Client => "client",
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An endpoint plus the mode it is queried in
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DataSource {
    endpoint: String,
    mode: ExecutionMode,
}

impl DataSource {
    pub fn new(endpoint: impl Into<String>, mode: ExecutionMode) -> Self {
        Self {
            endpoint: endpoint.into(),
            mode,
        }
    }

    pub fn server(endpoint: impl Into<String>) -> Self {
        Self::new(endpoint, ExecutionMode::Server)
    }

    pub fn client(endpoint: impl Into<String>) -> Self {
        Self::new(endpoint, ExecutionMode::Client)
    }

    /// Picks the mode from the endpoint's shape: absolute URLs are
    /// third-party bulk sources (client mode), relative paths belong to
    /// the local API (server mode).
    pub fn infer(endpoint: impl Into<String>) -> Self {
        let endpoint = endpoint.into();
        let mode = if is_absolute(&endpoint) {
            ExecutionMode::Client
        } else {
            ExecutionMode::Server
        };
        Self { endpoint, mode }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    /// True when the endpoint is a full URL and ignores `api_base_url`
    pub fn is_absolute(&self) -> bool {
        is_absolute(&self.endpoint)
    }

    /// Page cache key for `query` on this source. Includes the mode, so a
    /// server-mode and a client-mode source on one endpoint never share
    /// pages.
    pub fn cache_key(&self, query: &QueryState) -> String {
        query.cache_key(&format!("{}:{}", self.mode.as_str(), self.endpoint))
    }

    /// Resolves the endpoint against `api_base_url` unless already absolute
    pub fn url(&self, api_base_url: &str) -> String {
        if is_absolute(&self.endpoint) {
            self.endpoint.clone()
        } else {
            format!("{}{}", api_base_url, self.endpoint)
        }
    }
}

fn is_absolute(endpoint: &str) -> bool {
    endpoint.starts_with("http")
}
