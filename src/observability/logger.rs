//! Structured JSON logger
//!
//! - One log line = one event
//! - `event` first, then `severity`, then fields sorted by key
//! - Synchronous, no buffering
//! - Lines below the logger's minimum severity are dropped

use std::fmt;
use std::io::{self, Write};
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::events::Event;

/// Log severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Cache and pipeline detail
    Debug = 0,
    /// Normal operations
    Info = 1,
    /// Recoverable issues (malformed payloads)
    Warn = 2,
    /// Failed fetches
    Error = 3,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Debug => "DEBUG",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Ok(Severity::Debug),
            "info" => Ok(Severity::Info),
            "warn" | "warning" => Ok(Severity::Warn),
            "error" => Ok(Severity::Error),
            other => Err(format!("Unknown log level: {}", other)),
        }
    }
}

/// One structured log record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub severity: Severity,
    pub event: Event,
    /// Sorted by key
    pub fields: Vec<(String, String)>,
}

impl LogRecord {
    /// Builds a record, sorting fields for deterministic output
    pub fn new(severity: Severity, event: Event, fields: &[(&str, &str)]) -> Self {
        let mut fields: Vec<(String, String)> = fields
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        fields.sort_by(|a, b| a.0.cmp(&b.0));
        Self {
            severity,
            event,
            fields,
        }
    }

    /// Returns a field value by key
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Renders the record as one JSON line (with trailing newline)
    pub fn to_json_line(&self) -> String {
        let mut output = String::with_capacity(128);
        output.push_str("{\"event\":");
        output.push_str(&Value::from(self.event.as_str()).to_string());
        output.push_str(",\"severity\":");
        output.push_str(&Value::from(self.severity.as_str()).to_string());

        for (key, value) in &self.fields {
            output.push(',');
            output.push_str(&Value::from(key.as_str()).to_string());
            output.push(':');
            output.push_str(&Value::from(value.as_str()).to_string());
        }

        output.push_str("}\n");
        output
    }
}

/// Destination for log records
pub trait LogSink: Send + Sync {
    fn write(&self, record: &LogRecord);
}

/// Writes DEBUG/INFO to stdout and WARN/ERROR to stderr
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

impl LogSink for StdoutSink {
    fn write(&self, record: &LogRecord) {
        let line = record.to_json_line();
        // Logging never fails the caller
        if record.severity >= Severity::Warn {
            let mut stderr = io::stderr();
            let _ = stderr.write_all(line.as_bytes());
            let _ = stderr.flush();
        } else {
            let mut stdout = io::stdout();
            let _ = stdout.write_all(line.as_bytes());
            let _ = stdout.flush();
        }
    }
}

/// Keeps records in memory, for tests and embedding
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<LogRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all records so far
    pub fn records(&self) -> Vec<LogRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of records for `event`
    pub fn count(&self, event: Event) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|r| r.event == event)
            .count()
    }

    /// Records at or above `severity`
    pub fn at_least(&self, severity: Severity) -> Vec<LogRecord> {
        self.records()
            .into_iter()
            .filter(|r| r.severity >= severity)
            .collect()
    }

    pub fn clear(&self) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl LogSink for MemorySink {
    fn write(&self, record: &LogRecord) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record.clone());
    }
}

/// Cheaply cloneable logger handle
#[derive(Clone)]
pub struct Logger {
    sink: Arc<dyn LogSink>,
    min_severity: Severity,
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("min_severity", &self.min_severity)
            .finish_non_exhaustive()
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::stdout(Severity::Info)
    }
}

impl Logger {
    pub fn new(sink: Arc<dyn LogSink>, min_severity: Severity) -> Self {
        Self { sink, min_severity }
    }

    /// Logger writing JSON lines to stdout/stderr
    pub fn stdout(min_severity: Severity) -> Self {
        Self::new(Arc::new(StdoutSink), min_severity)
    }

    /// Logger capturing every record in memory
    pub fn memory() -> (Self, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        (Self::new(sink.clone(), Severity::Debug), sink)
    }

    pub fn min_severity(&self) -> Severity {
        self.min_severity
    }

    pub fn enabled(&self, severity: Severity) -> bool {
        severity >= self.min_severity
    }

    /// Logs `event` at an explicit severity
    pub fn log(&self, severity: Severity, event: Event, fields: &[(&str, &str)]) {
        if !self.enabled(severity) {
            return;
        }
        self.sink.write(&LogRecord::new(severity, event, fields));
    }

    /// Logs `event` at its default severity
    pub fn event(&self, event: Event, fields: &[(&str, &str)]) {
        self.log(event.default_severity(), event, fields);
    }

    pub fn debug(&self, event: Event, fields: &[(&str, &str)]) {
        self.log(Severity::Debug, event, fields);
    }

    pub fn info(&self, event: Event, fields: &[(&str, &str)]) {
        self.log(Severity::Info, event, fields);
    }

    pub fn warn(&self, event: Event, fields: &[(&str, &str)]) {
        self.log(Severity::Warn, event, fields);
    }

    pub fn error(&self, event: Event, fields: &[(&str, &str)]) {
        self.log(Severity::Error, event, fields);
    }
}
