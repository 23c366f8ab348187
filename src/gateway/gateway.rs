//! Query gateway
//!
//! Per request:
//!
//! ```text
//! Idle -> CacheCheck -> CacheHit -> Done
//!                    \-> CacheMiss -> Fetching -> Normalizing -> Caching -> Done
//! ```
//!
//! Client-mode sources skip `Fetching` when their dataset is still cached.
//! Failures jump straight to `Done` and leave the cache untouched.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::cache::{Clock, DatasetCache, QueryCache, SystemClock};
use crate::config::GatewayConfig;
use crate::engine::{ClientQueryEngine, PagedResult};
use crate::normalize::ResponseNormalizer;
use crate::observability::{Event, Logger};
use crate::query::QueryState;
use crate::row::{ColumnDescriptor, Row};

use super::errors::{GatewayError, TransportError};
use super::params::TransportRequest;
use super::source::{DataSource, ExecutionMode};
use super::transport::Transport;

/// Request pipeline states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineState {
    Idle,
    CacheCheck,
    CacheHit,
    CacheMiss,
    Fetching,
    Normalizing,
    Caching,
    Done,
}

impl PipelineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineState::Idle => "IDLE",
            PipelineState::CacheCheck => "CACHE_CHECK",
            PipelineState::CacheHit => "CACHE_HIT",
            PipelineState::CacheMiss => "CACHE_MISS",
            PipelineState::Fetching => "FETCHING",
            PipelineState::Normalizing => "NORMALIZING",
            PipelineState::Caching => "CACHING",
            PipelineState::Done => "DONE",
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where a page came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// Page cache
    Cache,
    /// Fresh remote fetch
    Remote,
    /// Engine run over a still-cached client-mode dataset
    Local,
}

/// Result of one gateway request. Always carries a page; empty on error.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOutcome {
    pub request_id: Uuid,
    pub result: PagedResult,
    pub origin: Origin,
    pub error: Option<GatewayError>,
    /// States visited, in order
    pub trace: Vec<PipelineState>,
}

impl QueryOutcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub fn user_message(&self) -> Option<&'static str> {
        self.error.as_ref().map(GatewayError::user_message)
    }
}

/// Tracks and logs the states of one request
struct PipelineRun<'a> {
    logger: &'a Logger,
    request_id: Uuid,
    endpoint: &'a str,
    trace: Vec<PipelineState>,
}

impl<'a> PipelineRun<'a> {
    fn start(logger: &'a Logger, endpoint: &'a str) -> Self {
        let mut run = Self {
            logger,
            request_id: Uuid::new_v4(),
            endpoint,
            trace: Vec::with_capacity(7),
        };
        run.enter(PipelineState::Idle);
        run
    }

    fn enter(&mut self, state: PipelineState) {
        self.trace.push(state);
        let request_id = self.request_id.to_string();
        self.logger.debug(
            Event::PipelineState,
            &[
                ("endpoint", self.endpoint),
                ("request_id", request_id.as_str()),
                ("state", state.as_str()),
            ],
        );
    }

    fn finish(mut self, result: PagedResult, origin: Origin, error: Option<GatewayError>) -> QueryOutcome {
        self.enter(PipelineState::Done);
        QueryOutcome {
            request_id: self.request_id,
            result,
            origin,
            error,
            trace: self.trace,
        }
    }
}

/// Orchestrates cache, transport, normalizer and engine.
///
/// Owns its caches; clones of the `Arc`s are shared by every concurrent
/// request on the same gateway.
pub struct QueryGateway {
    transport: Arc<dyn Transport>,
    normalizer: ResponseNormalizer,
    engine: ClientQueryEngine,
    cache: Arc<QueryCache>,
    datasets: Arc<DatasetCache>,
    api_base_url: String,
    logger: Logger,
}

impl QueryGateway {
    pub fn new(config: &GatewayConfig, transport: Arc<dyn Transport>, logger: Logger) -> Self {
        Self::with_clock(config, transport, logger, Arc::new(SystemClock))
    }

    /// Gateway whose caches read time from `clock`
    pub fn with_clock(
        config: &GatewayConfig,
        transport: Arc<dyn Transport>,
        logger: Logger,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            transport,
            normalizer: ResponseNormalizer::new(config.id_fallback_fields.clone(), logger.clone()),
            engine: ClientQueryEngine::new(),
            cache: Arc::new(QueryCache::with_clock(clock.clone())),
            datasets: Arc::new(DatasetCache::with_clock(clock)),
            api_base_url: config.api_base_url.clone(),
            logger,
        }
    }

    /// Coerces incoming cells to the kinds these columns declare
    pub fn with_columns(mut self, columns: Vec<ColumnDescriptor>) -> Self {
        self.normalizer = self.normalizer.with_columns(columns);
        self
    }

    /// Runs the request pipeline for `query` against `source`
    pub async fn load(&self, source: &DataSource, query: &QueryState) -> QueryOutcome {
        let mut run = PipelineRun::start(&self.logger, source.endpoint());
        run.enter(PipelineState::CacheCheck);

        let key = source.cache_key(query);
        if let Some(result) = self.cache.get(&key) {
            self.logger.debug(Event::CacheHit, &[("key", key.as_str())]);
            run.enter(PipelineState::CacheHit);
            return run.finish(result, Origin::Cache, None);
        }

        self.logger.debug(Event::CacheMiss, &[("key", key.as_str())]);
        run.enter(PipelineState::CacheMiss);

        match source.mode() {
            ExecutionMode::Server => self.load_server(run, source, query, key).await,
            ExecutionMode::Client => self.load_client(run, source, query, key).await,
        }
    }

    /// Request the gateway would send for `query` on a miss
    pub fn transport_request(&self, source: &DataSource, query: &QueryState) -> TransportRequest {
        TransportRequest::for_source(source, &self.api_base_url, query)
    }

    /// Empties the page cache and the dataset cache
    pub fn clear_cache(&self) {
        self.cache.clear();
        self.datasets.clear();
        self.logger.info(Event::CacheCleared, &[]);
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub fn dataset_cache(&self) -> &DatasetCache {
        &self.datasets
    }

    async fn load_server(
        &self,
        mut run: PipelineRun<'_>,
        source: &DataSource,
        query: &QueryState,
        key: String,
    ) -> QueryOutcome {
        run.enter(PipelineState::Fetching);
        let request = self.transport_request(source, query);
        let payload = match self.fetch(&request, run.request_id).await {
            Ok(payload) => payload,
            Err(err) => return run.finish(empty_page(query), Origin::Remote, Some(err.into())),
        };

        run.enter(PipelineState::Normalizing);
        let normalized = self.normalizer.normalize(&payload, query, ExecutionMode::Server);
        if let Some(warning) = normalized.warning {
            return run.finish(normalized.result, Origin::Remote, Some(warning.into()));
        }

        run.enter(PipelineState::Caching);
        self.store(key, &normalized.result);
        run.finish(normalized.result, Origin::Remote, None)
    }

    async fn load_client(
        &self,
        mut run: PipelineRun<'_>,
        source: &DataSource,
        query: &QueryState,
        key: String,
    ) -> QueryOutcome {
        let url = source.url(&self.api_base_url);

        let (rows, origin) = match self.datasets.get(&url) {
            Some(rows) => {
                self.logger.debug(
                    Event::DatasetReused,
                    &[("rows", rows.len().to_string().as_str()), ("url", url.as_str())],
                );
                run.enter(PipelineState::Normalizing);
                (rows, Origin::Local)
            }
            None => {
                run.enter(PipelineState::Fetching);
                let request = TransportRequest::bulk(url.clone());
                let payload = match self.fetch(&request, run.request_id).await {
                    Ok(payload) => payload,
                    Err(err) => {
                        return run.finish(empty_page(query), Origin::Remote, Some(err.into()))
                    }
                };

                run.enter(PipelineState::Normalizing);
                match self.normalizer.dataset(&payload) {
                    Ok(rows) => {
                        let rows: Arc<Vec<Row>> = Arc::new(rows);
                        self.datasets.set(url, rows.clone());
                        (rows, Origin::Remote)
                    }
                    Err(err) => {
                        self.normalizer.warn_malformed(&payload, &err);
                        return run.finish(empty_page(query), Origin::Remote, Some(err.into()));
                    }
                }
            }
        };

        let result = self.engine.execute(&rows, query);
        run.enter(PipelineState::Caching);
        self.store(key, &result);
        run.finish(result, origin, None)
    }

    async fn fetch(&self, request: &TransportRequest, request_id: Uuid) -> Result<Value, TransportError> {
        let request_id = request_id.to_string();
        let url = request.display_url();
        self.logger.debug(
            Event::FetchStarted,
            &[("request_id", request_id.as_str()), ("url", url.as_str())],
        );

        let outcome = self.transport.get(request).await;
        if let Err(err) = &outcome {
            let message = err.to_string();
            self.logger.error(
                Event::FetchFailed,
                &[
                    ("code", err.code()),
                    ("message", message.as_str()),
                    ("request_id", request_id.as_str()),
                    ("url", url.as_str()),
                ],
            );
        }
        outcome
    }

    fn store(&self, key: String, result: &PagedResult) {
        let total = result.total.to_string();
        self.logger.debug(
            Event::ResultCached,
            &[("key", key.as_str()), ("total", total.as_str())],
        );
        self.cache.set(key, result.clone());
    }
}

fn empty_page(query: &QueryState) -> PagedResult {
    PagedResult::empty(query.page(), query.size())
}
