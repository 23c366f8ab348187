//! Observability
//!
//! Structured logging for the query pipeline: cache hits and misses,
//! fetch failures and malformed payloads.
//!
//! # Principles
//!
//! 1. Observability is read-only
//! 2. Logging never fails or blocks the pipeline
//! 3. Deterministic output (sorted fields)
//!
//! # Usage
//!
//! ```ignore
//! use gridquery::observability::{Event, Logger, Severity};
//!
//! let logger = Logger::stdout(Severity::Debug);
//! logger.event(Event::CacheHit, &[("key", "/users:{...}")]);
//! ```

mod events;
mod logger;

pub use events::Event;
pub use logger::{LogRecord, LogSink, Logger, MemorySink, Severity, StdoutSink};
