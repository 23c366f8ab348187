//! Query Gateway Pipeline Tests
//!
//! - Query translates to ordered transport params
//! - Cached pages are served without a fetch
//! - Failures and malformed payloads are never cached
//! - Server and client mode agree on the same rows
//! - The last completed write wins in the cache
//! - Entries expire exactly at the TTL

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Duration;
use serde_json::{json, Value};

use gridquery::cache::{cache_ttl, ManualClock};
use gridquery::config::GatewayConfig;
use gridquery::engine::ClientQueryEngine;
use gridquery::gateway::{
    DataSource, ExecutionMode, GatewayError, Origin, PipelineState, QueryGateway, StaticTransport,
    TransportError, TransportRequest,
};
use gridquery::normalize::ResponseNormalizer;
use gridquery::observability::{Event, Logger, MemorySink, Severity};
use gridquery::query::{FilterCriterion, FilterOperator, QueryState, SortSpec};

// =============================================================================
// Helper Functions
// =============================================================================

const USERS_URL: &str = "/api/users";
const COUNTRIES_URL: &str = "https://restcountries.com/v3.1/all";

fn gateway(transport: &Arc<StaticTransport>) -> (QueryGateway, Arc<MemorySink>) {
    let (logger, sink) = Logger::memory();
    let gateway = QueryGateway::new(&GatewayConfig::default(), transport.clone(), logger);
    (gateway, sink)
}

fn clocked_gateway(
    transport: &Arc<StaticTransport>,
    clock: &Arc<ManualClock>,
) -> QueryGateway {
    let (logger, _) = Logger::memory();
    QueryGateway::with_clock(
        &GatewayConfig::default(),
        transport.clone(),
        logger,
        clock.clone(),
    )
}

fn users_envelope(ids: &[&str], total: usize) -> Value {
    let data: Vec<Value> = ids.iter().map(|id| json!({"id": id, "name": id})).collect();
    json!({ "data": data, "total": total })
}

fn people() -> Value {
    json!([
        {"id": "1", "name": "Ann", "status": "Active", "age": 34},
        {"id": "2", "name": "Bob", "status": "Inactive", "age": 27},
        {"id": "3", "name": "Cy", "status": "Active", "age": 41},
        {"id": "4", "name": "Dee", "status": "Pending", "age": 19},
        {"id": "5", "name": "Eve", "status": "Active", "age": 27},
        {"id": "6", "name": "Fay", "status": "Active", "age": 55}
    ])
}

// =============================================================================
// Parameter Translation
// =============================================================================

/// Params go out as page, size, global, sort, then filters.
#[test]
fn test_params_order() {
    let query = QueryState::default()
        .searching("test")
        .sorted_by(SortSpec::asc("name"))
        .filtered_by("status", "active");

    let request = TransportRequest::server("/api/test", &query);
    assert_eq!(
        request.display_url(),
        "/api/test?page=0&size=10&global=test&sort=name:asc&filter[status]=active"
    );
}

/// Client-mode sources fetch the bare URL.
#[test]
fn test_bulk_request_has_no_params() {
    let transport = Arc::new(StaticTransport::new());
    let (gateway, _) = gateway(&transport);
    let query = QueryState::default().searching("x");

    let request = gateway.transport_request(&DataSource::infer(COUNTRIES_URL), &query);
    assert_eq!(request.url, COUNTRIES_URL);
    assert!(request.query_params.is_empty());
}

// =============================================================================
// Cache Behavior
// =============================================================================

/// The second identical load is a cache hit with no transport call.
#[tokio::test]
async fn test_second_load_served_from_cache() {
    let transport = Arc::new(StaticTransport::new().with_payload(USERS_URL, users_envelope(&["a", "b"], 2)));
    let (gateway, sink) = gateway(&transport);
    let source = DataSource::server("/users");
    let query = QueryState::default();

    let first = gateway.load(&source, &query).await;
    let second = gateway.load(&source, &query).await;

    assert_eq!(first.origin, Origin::Remote);
    assert_eq!(second.origin, Origin::Cache);
    assert_eq!(first.result, second.result);
    assert_eq!(transport.request_count(), 1);
    assert_eq!(sink.count(Event::CacheHit), 1);
    assert_eq!(
        second.trace,
        vec![
            PipelineState::Idle,
            PipelineState::CacheCheck,
            PipelineState::CacheHit,
            PipelineState::Done
        ]
    );
}

/// A failed fetch yields an empty page, is logged, and is retried next time.
#[tokio::test]
async fn test_failure_not_cached() {
    let transport = Arc::new(StaticTransport::new());
    transport.push_error(
        USERS_URL,
        TransportError::Status {
            status: 500,
            body: "boom".to_string(),
        },
    );
    transport.push_payload(USERS_URL, users_envelope(&["a"], 1));
    let (gateway, sink) = gateway(&transport);
    let source = DataSource::server("/users");
    let query = QueryState::default();

    let failed = gateway.load(&source, &query).await;
    assert!(!failed.is_ok());
    assert!(failed.result.is_empty());
    assert_eq!(failed.result.total, 0);
    assert_eq!(failed.user_message(), Some("Internal Server Error"));
    assert!(gateway.cache().is_empty());

    let errors = sink.at_least(Severity::Error);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].event, Event::FetchFailed);

    let retried = gateway.load(&source, &query).await;
    assert!(retried.is_ok());
    assert_eq!(retried.origin, Origin::Remote);
    assert_eq!(retried.result.ids(), vec!["a"]);
    assert_eq!(transport.request_count(), 2);
}

/// `{}` from a server source: empty page, a warning, nothing cached.
#[tokio::test]
async fn test_malformed_payload_yields_empty_page() {
    let transport = Arc::new(StaticTransport::new().with_payload(USERS_URL, json!({})));
    let (gateway, sink) = gateway(&transport);
    let source = DataSource::server("/users");

    let outcome = gateway.load(&source, &QueryState::default()).await;

    assert!(outcome.result.is_empty());
    assert_eq!(outcome.result.total, 0);
    assert_eq!(outcome.result.total_pages, 0);
    assert!(matches!(outcome.error, Some(GatewayError::MalformedResponse(_))));
    assert_eq!(sink.count(Event::MalformedResponse), 1);
    assert_eq!(sink.at_least(Severity::Warn)[0].event, Event::MalformedResponse);
    assert!(gateway.cache().is_empty());
}

/// Clearing drops cached pages and forces a refetch.
#[tokio::test]
async fn test_clear_cache_forces_refetch() {
    let transport = Arc::new(StaticTransport::new().with_payload(USERS_URL, users_envelope(&["a"], 1)));
    let (gateway, sink) = gateway(&transport);
    let source = DataSource::server("/users");
    let query = QueryState::default();

    gateway.load(&source, &query).await;
    gateway.clear_cache();
    let outcome = gateway.load(&source, &query).await;

    assert_eq!(outcome.origin, Origin::Remote);
    assert_eq!(transport.request_count(), 2);
    assert_eq!(sink.count(Event::CacheCleared), 1);
}

// =============================================================================
// Client Mode
// =============================================================================

/// The bulk dataset is fetched once and reused for new queries.
#[tokio::test]
async fn test_client_mode_reuses_dataset() {
    let countries = json!([
        {"cca3": "FRA", "name": {"common": "France"}, "region": "Europe"},
        {"cca3": "JPN", "name": {"common": "Japan"}, "region": "Asia"},
        {"cca3": "DEU", "name": {"common": "Germany"}, "region": "Europe"}
    ]);
    let transport = Arc::new(StaticTransport::new().with_payload(COUNTRIES_URL, countries));
    let (gateway, sink) = gateway(&transport);
    let source = DataSource::infer(COUNTRIES_URL);
    assert_eq!(source.mode(), ExecutionMode::Client);

    let europe = gateway
        .load(&source, &QueryState::default().filtered_by("region", "europe"))
        .await;
    assert_eq!(europe.origin, Origin::Remote);
    assert_eq!(europe.result.ids(), vec!["FRA", "DEU"]);

    let sorted = gateway
        .load(&source, &QueryState::default().sorted_by(SortSpec::asc("cca3")))
        .await;
    assert_eq!(sorted.origin, Origin::Local);
    assert_eq!(sorted.result.ids(), vec!["DEU", "FRA", "JPN"]);
    assert!(!sorted.trace.contains(&PipelineState::Fetching));

    assert_eq!(transport.request_count(), 1);
    assert_eq!(transport.requests()[0].url, COUNTRIES_URL);
    assert_eq!(sink.count(Event::DatasetReused), 1);
}

/// A server-mode and a client-mode source on one endpoint keep separate pages.
#[tokio::test]
async fn test_modes_do_not_share_cached_pages() {
    let transport = Arc::new(StaticTransport::new().with_payload("/api/people", people()));
    let (gateway, _) = gateway(&transport);
    let query = QueryState::new(0, 2)
        .unwrap()
        .sorted_by(SortSpec::desc("age"));

    let server = gateway.load(&DataSource::server("/people"), &query).await;
    let client = gateway.load(&DataSource::client("/people"), &query).await;

    assert_eq!(server.origin, Origin::Remote);
    assert_eq!(client.origin, Origin::Remote);
    assert_eq!(server.result.ids(), vec!["1", "2"]);
    assert_eq!(client.result.ids(), vec!["6", "3"]);
    assert_eq!(gateway.cache().len(), 2);
    assert_eq!(transport.request_count(), 2);
}

/// Same rows and query through a server envelope and through client mode.
#[tokio::test]
async fn test_server_and_client_mode_agree() {
    let query = QueryState::new(1, 2)
        .unwrap()
        .sorted_by(SortSpec::desc("age"))
        .sorted_by(SortSpec::asc("name"))
        .filtered_by(
            "status",
            FilterCriterion::structured(FilterOperator::Eq, "active"),
        );

    let (logger, _) = Logger::memory();
    let rows = ResponseNormalizer::new(Vec::new(), logger)
        .dataset(&people())
        .unwrap();
    let page = ClientQueryEngine::new().execute(&rows, &query);
    let envelope = json!({
        "data": page.rows,
        "total": page.total,
        "page": page.page,
        "size": page.size,
        "totalPages": page.total_pages,
    });

    let transport = Arc::new(
        StaticTransport::new()
            .with_payload(USERS_URL, envelope)
            .with_payload("/api/people", people()),
    );
    let (gateway, _) = gateway(&transport);

    let server = gateway.load(&DataSource::server("/users"), &query).await;
    let client = gateway.load(&DataSource::client("/people"), &query).await;

    assert!(server.is_ok());
    assert!(client.is_ok());
    assert_eq!(server.result, client.result);
    assert_eq!(client.result.ids(), vec!["1", "5"]);
    assert_eq!(client.result.total, 4);
    assert_eq!(client.result.total_pages, 2);
}

// =============================================================================
// Concurrency
// =============================================================================

/// Two in-flight loads for one key: the later completion owns the cache.
#[tokio::test]
async fn test_last_completed_write_wins() {
    let transport = Arc::new(StaticTransport::new());
    transport.push_delayed(
        USERS_URL,
        Ok(users_envelope(&["slow"], 1)),
        StdDuration::from_millis(50),
    );
    transport.push_delayed(
        USERS_URL,
        Ok(users_envelope(&["fast"], 1)),
        StdDuration::from_millis(10),
    );
    let (gateway, _) = gateway(&transport);
    let source = DataSource::server("/users");
    let query = QueryState::default();

    let (a, b) = tokio::join!(gateway.load(&source, &query), gateway.load(&source, &query));

    assert_eq!(transport.request_count(), 2);
    assert_eq!(a.origin, Origin::Remote);
    assert_eq!(b.origin, Origin::Remote);
    assert_ne!(a.result, b.result);

    let slow = if a.result.ids() == vec!["slow"] { &a } else { &b };
    let cached = gateway.cache().get(&source.cache_key(&query)).unwrap();
    assert_eq!(cached, slow.result);
}

// =============================================================================
// Expiry
// =============================================================================

/// Hit at 4:59, miss at 5:00, and again 5:01 after the refetch.
#[tokio::test]
async fn test_ttl_boundary() {
    assert_eq!(cache_ttl(), Duration::minutes(5));

    let transport = Arc::new(StaticTransport::new().with_payload(USERS_URL, users_envelope(&["a"], 1)));
    let clock = Arc::new(ManualClock::starting_now());
    let gateway = clocked_gateway(&transport, &clock);
    let source = DataSource::server("/users");
    let query = QueryState::default();

    gateway.load(&source, &query).await;

    clock.advance(Duration::seconds(299));
    assert_eq!(gateway.load(&source, &query).await.origin, Origin::Cache);
    assert_eq!(transport.request_count(), 1);

    clock.advance(Duration::seconds(1));
    assert_eq!(gateway.load(&source, &query).await.origin, Origin::Remote);
    assert_eq!(transport.request_count(), 2);

    clock.advance(Duration::seconds(301));
    assert_eq!(gateway.load(&source, &query).await.origin, Origin::Remote);
    assert_eq!(transport.request_count(), 3);
}

/// Unknown endpoints surface as a 404 with its user message.
#[tokio::test]
async fn test_unknown_endpoint_is_not_found() {
    let transport = Arc::new(StaticTransport::new());
    let (gateway, _) = gateway(&transport);

    let outcome = gateway
        .load(&DataSource::server("/missing"), &QueryState::default())
        .await;

    assert_eq!(outcome.user_message(), Some("Not Found"));
    assert!(outcome.error.as_ref().is_some_and(GatewayError::is_transport));
}
