//! Table session
//!
//! Holds the current query of one table and applies the UI operations
//! (load, page, sort, filter, search, reset). Every operation produces a
//! new `QueryState` and runs it through the gateway; the outcome of the
//! most recently completed call is what the session shows.

use std::sync::Arc;

use serde::Serialize;

use crate::engine::PagedResult;
use crate::gateway::{DataSource, QueryGateway, QueryOutcome};
use crate::observability::{Event, Logger};
use crate::query::{FilterCriterion, QueryResult, QueryState, SortDirection};
use crate::row::Row;

/// What a table renders
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableState {
    pub query: QueryState,
    pub loading: bool,
    /// User-facing message of the last failure, if any
    pub error: Option<String>,
    pub rows: Vec<Row>,
    pub total: usize,
    pub total_pages: usize,
}

impl TableState {
    fn initial(query: QueryState) -> Self {
        Self {
            query,
            loading: false,
            error: None,
            rows: Vec::new(),
            total: 0,
            total_pages: 0,
        }
    }

    fn apply(&mut self, query: QueryState, result: PagedResult, error: Option<String>) {
        self.query = query;
        self.loading = false;
        self.error = error;
        self.rows = result.rows;
        self.total = result.total;
        self.total_pages = result.total_pages;
    }
}

/// One table bound to one data source
pub struct TableSession {
    gateway: Arc<QueryGateway>,
    source: DataSource,
    state: TableState,
    logger: Logger,
}

impl TableSession {
    pub fn new(gateway: Arc<QueryGateway>, source: DataSource, logger: Logger) -> Self {
        Self {
            gateway,
            source,
            state: TableState::initial(QueryState::default()),
            logger,
        }
    }

    pub fn state(&self) -> &TableState {
        &self.state
    }

    pub fn query(&self) -> &QueryState {
        &self.state.query
    }

    pub fn source(&self) -> &DataSource {
        &self.source
    }

    /// Replaces the whole query
    pub async fn load(&mut self, query: QueryState) -> &TableState {
        self.run(query).await;
        &self.state
    }

    /// Re-runs the current query
    pub async fn refresh(&mut self) -> &TableState {
        let query = self.state.query.clone();
        self.load(query).await
    }

    pub async fn change_page(&mut self, page: usize, size: usize) -> QueryResult<&TableState> {
        let query = self.state.query.with_page(page, size)?;
        Ok(self.load(query).await)
    }

    /// Sorts by `field` at the lowest priority; back to page 0
    pub async fn change_sort(&mut self, field: &str, direction: SortDirection) -> &TableState {
        let query = self.state.query.with_sort(field, direction);
        self.load(query).await
    }

    pub async fn clear_sort(&mut self, field: &str) -> &TableState {
        let query = self.state.query.without_sort(field);
        self.load(query).await
    }

    /// Sets a filter; `None` or a blank criterion removes it. Back to page 0.
    pub async fn change_filter(
        &mut self,
        field: &str,
        criterion: Option<FilterCriterion>,
    ) -> &TableState {
        let query = self.state.query.with_filter(field, criterion);
        self.load(query).await
    }

    pub async fn change_global(&mut self, term: &str) -> &TableState {
        let query = self.state.query.with_global(term);
        self.load(query).await
    }

    /// Back to page 0 with the default page size, no sorts, filters or search
    pub async fn reset(&mut self) -> &TableState {
        self.load(QueryState::default()).await
    }

    pub fn gateway(&self) -> &Arc<QueryGateway> {
        &self.gateway
    }

    /// Marks `query` as in flight without running it.
    ///
    /// For callers that drive the gateway themselves; `loading` stays set
    /// until the matching [`apply_outcome`](Self::apply_outcome).
    pub fn begin(&mut self, query: &QueryState) -> &TableState {
        let key = self.source.cache_key(query);
        self.logger.info(
            Event::QueryChanged,
            &[("endpoint", self.source.endpoint()), ("key", key.as_str())],
        );
        self.state.loading = true;
        &self.state
    }

    /// Applies an outcome produced elsewhere (e.g. a query issued
    /// concurrently). The last applied outcome wins.
    pub fn apply_outcome(&mut self, query: QueryState, outcome: QueryOutcome) {
        let error = outcome.user_message().map(str::to_string);
        self.state.apply(query, outcome.result, error);
    }

    async fn run(&mut self, query: QueryState) {
        self.begin(&query);
        let outcome = self.gateway.load(&self.source, &query).await;
        self.apply_outcome(query, outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GatewayConfig;
    use crate::gateway::{StaticTransport, TransportError};
    use serde_json::{json, Value};

    fn session(transport: Arc<StaticTransport>, source: DataSource) -> TableSession {
        let (logger, _) = Logger::memory();
        let gateway = QueryGateway::new(&GatewayConfig::default(), transport, logger.clone());
        TableSession::new(Arc::new(gateway), source, logger)
    }

    fn people() -> Value {
        json!([
            {"id": "1", "name": "Cleo", "status": "Active"},
            {"id": "2", "name": "Abe", "status": "Inactive"},
            {"id": "3", "name": "Bea", "status": "Active"},
        ])
    }

    #[tokio::test]
    async fn test_sort_resets_page() {
        let transport = Arc::new(StaticTransport::new().with_payload("https://x.test/p", people()));
        let mut table = session(transport, DataSource::client("https://x.test/p"));

        table.change_page(1, 2).await.unwrap();
        assert_eq!(table.state().rows.len(), 1);

        let state = table.change_sort("name", SortDirection::Asc).await;
        assert_eq!(state.query.page(), 0);
        let ids: Vec<&str> = state.rows.iter().map(Row::id).collect();
        assert_eq!(ids, vec!["2", "3"]);
        assert_eq!(state.total_pages, 2);
    }

    #[tokio::test]
    async fn test_failure_sets_user_message_and_empties_rows() {
        let transport = Arc::new(StaticTransport::new());
        transport.push_payload("/api/people", json!({"data": [{"id": "1"}], "total": 1}));
        transport.push_error(
            "/api/people",
            TransportError::Status {
                status: 403,
                body: String::new(),
            },
        );
        let mut table = session(transport, DataSource::server("/people"));

        let state = table.load(QueryState::default()).await;
        assert_eq!(state.total, 1);
        assert!(state.error.is_none());

        let state = table.change_global("x").await;
        assert_eq!(state.error.as_deref(), Some("Forbidden"));
        assert!(state.rows.is_empty());
        assert!(!state.loading);
    }

    #[tokio::test]
    async fn test_reset_restores_defaults() {
        let transport = Arc::new(StaticTransport::new().with_payload("https://x.test/p", people()));
        let mut table = session(transport, DataSource::client("https://x.test/p"));

        table.change_page(0, 2).await.unwrap();
        table.change_filter("status", Some("active".into())).await;
        table.change_global("a").await;

        let state = table.reset().await;
        assert_eq!(state.query, QueryState::default());
        assert_eq!(state.total, 3);
    }

    #[tokio::test]
    async fn test_begin_sets_loading_until_applied() {
        let transport = Arc::new(StaticTransport::new().with_payload("https://x.test/p", people()));
        let mut table = session(transport, DataSource::client("https://x.test/p"));
        let query = QueryState::default().with_global("bea");

        assert!(table.begin(&query).loading);
        assert!(table.state().rows.is_empty());

        let gateway = table.gateway().clone();
        let outcome = gateway.load(table.source(), &query).await;
        assert!(table.state().loading);

        table.apply_outcome(query, outcome);
        assert!(!table.state().loading);
        let ids: Vec<&str> = table.state().rows.iter().map(Row::id).collect();
        assert_eq!(ids, vec!["3"]);
    }

    #[tokio::test]
    async fn test_invalid_page_size_rejected() {
        let transport = Arc::new(StaticTransport::new().with_payload("https://x.test/p", people()));
        let mut table = session(transport, DataSource::client("https://x.test/p"));
        assert!(table.change_page(0, 0).await.is_err());
    }
}
