//! Time-bounded query cache
//!
//! Memoizes `(endpoint, QueryState) -> PagedResult` for five minutes.
//! The gateway owns its caches explicitly; there is no process-wide
//! instance.
//!
//! # Invariants
//!
//! - A hit requires `now - stored_at < TTL`
//! - `set` overwrites unconditionally; concurrent writers for the same key
//!   resolve as last write wins
//! - No in-flight deduplication: two concurrent misses both fetch

mod clock;
mod store;

use std::sync::Arc;

pub use clock::{Clock, ManualClock, SystemClock};
pub use store::{cache_ttl, CacheEntry, CacheStats, TimedCache};

use crate::engine::PagedResult;
use crate::row::Row;

/// Page cache keyed by `DataSource::cache_key`
pub type QueryCache = TimedCache<PagedResult>;

/// Full client-mode datasets keyed by URL
pub type DatasetCache = TimedCache<Arc<Vec<Row>>>;
