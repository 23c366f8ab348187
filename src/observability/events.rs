//! Observable events
//!
//! Every log line names one of these events. Events are explicit and typed.

use std::fmt;

use super::logger::Severity;

/// Observable events in the query pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Event {
    // Cache
    /// Page served from cache
    CacheHit,
    /// No fresh cache entry for the key
    CacheMiss,
    /// Cache emptied on request
    CacheCleared,
    /// Page written to cache
    ResultCached,
    /// Bulk dataset served from the dataset cache
    DatasetReused,

    // Remote
    /// Remote fetch issued
    FetchStarted,
    /// Remote fetch rejected or unreachable
    FetchFailed,
    /// Payload shape not recognized
    MalformedResponse,

    // Pipeline
    /// Request pipeline entered a new state
    PipelineState,
    /// Table session produced a new query
    QueryChanged,
}

impl Event {
    /// Returns the event name as it appears in log lines
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::CacheHit => "CACHE_HIT",
            Event::CacheMiss => "CACHE_MISS",
            Event::CacheCleared => "CACHE_CLEARED",
            Event::ResultCached => "RESULT_CACHED",
            Event::DatasetReused => "DATASET_REUSED",
            Event::FetchStarted => "FETCH_STARTED",
            Event::FetchFailed => "FETCH_FAILED",
            Event::MalformedResponse => "MALFORMED_RESPONSE",
            Event::PipelineState => "PIPELINE_STATE",
            Event::QueryChanged => "QUERY_CHANGED",
        }
    }

    /// Severity the event is normally logged at
    pub fn default_severity(&self) -> Severity {
        match self {
            Event::FetchFailed => Severity::Error,
            Event::MalformedResponse => Severity::Warn,
            Event::CacheCleared | Event::QueryChanged => Severity::Info,
            _ => Severity::Debug,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
