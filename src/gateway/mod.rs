//! Query gateway
//!
//! Decides server mode vs client mode, builds transport requests, invokes
//! the normalizer or the client engine and populates the cache.
//!
//! # Invariants
//!
//! - A failed request never populates the cache
//! - Failures are never fatal: the outcome carries an empty page and the error
//! - Concurrent requests for one key both fetch; the last to finish wins
//!   the cache slot

#[allow(clippy::module_inception)]
mod gateway;
mod errors;
mod params;
mod source;
mod transport;

pub use errors::{GatewayError, GatewayResult, TransportError};
pub use gateway::{Origin, PipelineState, QueryGateway, QueryOutcome};
pub use params::{query_params, TransportRequest};
pub use source::{DataSource, ExecutionMode};
pub use transport::{HttpTransport, StaticTransport, Transport, TransportFuture};
