//! Gateway Configuration
//!
//! Base URL for relative endpoints, log level, id fallbacks and the HTTP
//! transport timeout. Loaded from a JSON file; every field has a default.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::observability::Severity;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Gateway configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Prefix for relative endpoints (default: "/api")
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Minimum log severity (default: info)
    #[serde(default = "default_log_level")]
    pub log_level: Severity,

    /// Fields tried, in order, when a payload item has no `id`
    /// (default: ["cca3"])
    #[serde(default = "default_id_fallback_fields")]
    pub id_fallback_fields: Vec<String>,

    /// HTTP transport timeout in seconds (default: 30)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_api_base_url() -> String {
    "/api".to_string()
}

fn default_log_level() -> Severity {
    Severity::Info
}

fn default_id_fallback_fields() -> Vec<String> {
    // REST Countries keys its records by ISO alpha-3 code
    vec!["cca3".to_string()]
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            log_level: default_log_level(),
            id_fallback_fields: default_id_fallback_fields(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl GatewayConfig {
    /// Config with a different base URL
    pub fn with_base_url(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            ..Default::default()
        }
    }

    /// Reads and validates a JSON config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let display = path.display().to_string();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: display.clone(),
            source,
        })?;
        let config: GatewayConfig =
            serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
                path: display,
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_base_url.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "api_base_url must not be empty".to_string(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "request_timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Validates for fetching relative endpoints over HTTP.
    ///
    /// The base URL must then be absolute; "/api" only works behind a
    /// host that resolves it.
    pub fn validate_for_http(&self) -> Result<(), ConfigError> {
        self.validate()?;
        let base = self.api_base_url.trim();
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "api_base_url '{}' must be an absolute http(s) URL to fetch relative endpoints",
                self.api_base_url
            )));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
