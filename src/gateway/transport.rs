//! Transport seam
//!
//! The gateway only needs "GET this URL with these parameters, give me
//! JSON". Retries, tracing headers and auth belong to the transport, not
//! to the gateway.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use serde_json::Value;

use super::errors::TransportError;
use super::params::TransportRequest;
use crate::config::GatewayConfig;

/// Future returned by [`Transport::get`]
pub type TransportFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Value, TransportError>> + Send + 'a>>;

/// Performs GET requests and decodes JSON bodies
pub trait Transport: Send + Sync {
    fn get<'a>(&'a self, request: &'a TransportRequest) -> TransportFuture<'a>;
}

// =============================================================================
// HTTP
// =============================================================================

/// reqwest-backed transport
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("gridquery/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Network(format!("client setup failed: {}", e)))?;
        Ok(Self { http })
    }

    pub fn from_config(config: &GatewayConfig) -> Result<Self, TransportError> {
        Self::new(config.request_timeout())
    }
}

impl Transport for HttpTransport {
    fn get<'a>(&'a self, request: &'a TransportRequest) -> TransportFuture<'a> {
        Box::pin(async move {
            let url = request_url(request)?;
            let resp = self
                .http
                .get(url)
                .send()
                .await
                .map_err(|e| TransportError::Network(e.to_string()))?;
            let resp = check_response(resp).await?;
            resp.json::<Value>()
                .await
                .map_err(|e| TransportError::Decode(e.to_string()))
        })
    }
}

fn request_url(request: &TransportRequest) -> Result<reqwest::Url, TransportError> {
    let parsed = if request.query_params.is_empty() {
        reqwest::Url::parse(&request.url)
    } else {
        reqwest::Url::parse_with_params(&request.url, &request.query_params)
    };
    parsed.map_err(|e| TransportError::InvalidUrl {
        url: request.url.clone(),
        reason: e.to_string(),
    })
}

/// Maps non-success statuses to [`TransportError::Status`]
async fn check_response(resp: reqwest::Response) -> Result<reqwest::Response, TransportError> {
    if !resp.status().is_success() {
        return Err(TransportError::Status {
            status: resp.status().as_u16(),
            body: resp.text().await.unwrap_or_default(),
        });
    }
    Ok(resp)
}

// =============================================================================
// Static
// =============================================================================

#[derive(Debug, Clone)]
struct CannedReply {
    outcome: Result<Value, TransportError>,
    delay: Option<Duration>,
}

/// Serves canned payloads per URL.
///
/// Replies for a URL are served in order; the last one repeats. Every
/// request is recorded.
#[derive(Debug, Default)]
pub struct StaticTransport {
    routes: Mutex<HashMap<String, VecDeque<CannedReply>>>,
    requests: Mutex<Vec<TransportRequest>>,
}

impl StaticTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`push_payload`](Self::push_payload)
    pub fn with_payload(self, url: impl Into<String>, payload: Value) -> Self {
        self.push_payload(url, payload);
        self
    }

    pub fn push_payload(&self, url: impl Into<String>, payload: Value) {
        self.push(url, Ok(payload), None);
    }

    pub fn push_error(&self, url: impl Into<String>, error: TransportError) {
        self.push(url, Err(error), None);
    }

    /// Queues a reply that resolves only after `delay`
    pub fn push_delayed(
        &self,
        url: impl Into<String>,
        outcome: Result<Value, TransportError>,
        delay: Duration,
    ) {
        self.push(url, outcome, Some(delay));
    }

    fn push(&self, url: impl Into<String>, outcome: Result<Value, TransportError>, delay: Option<Duration>) {
        self.routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(url.into())
            .or_default()
            .push_back(CannedReply { outcome, delay });
    }

    /// Every request seen so far, in arrival order
    pub fn requests(&self) -> Vec<TransportRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn next_reply(&self, url: &str) -> Option<CannedReply> {
        let mut routes = self.routes.lock().unwrap_or_else(PoisonError::into_inner);
        let queue = routes.get_mut(url)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

impl Transport for StaticTransport {
    fn get<'a>(&'a self, request: &'a TransportRequest) -> TransportFuture<'a> {
        Box::pin(async move {
            self.requests
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(request.clone());

            let reply = self.next_reply(&request.url).ok_or_else(|| TransportError::Status {
                status: 404,
                body: format!("no canned response for {}", request.url),
            })?;

            if let Some(delay) = reply.delay {
                tokio::time::sleep(delay).await;
            }
            reply.outcome
        })
    }
}
