//! Event log — structured records of every negotiation decision.
//!
//! Policy denials, user denials, hook vetoes, and execution errors flow
//! through a single [`EventLogger`] with pluggable output sinks, so a session
//! can always answer "why did the LLM receive an empty result here".

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Severity levels for log entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warn => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

/// A structured log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    /// Source component (e.g. "conversation", "policy", "hook:shellcheck").
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}

impl LogEntry {
    pub fn new(level: LogLevel, source: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            source: source.into(),
            session_id: None,
            message: message.into(),
            payload: None,
        }
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Format as a single-line log string.
    pub fn format_line(&self) -> String {
        let ts = self.timestamp.format("%Y-%m-%dT%H:%M:%S%.3fZ");
        let session = self
            .session_id
            .as_deref()
            .map(|s| format!(" [{s}]"))
            .unwrap_or_default();
        format!("{ts} {} {}{} {}", self.level, self.source, session, self.message)
    }
}

/// Trait for log output sinks.
pub trait LogSink: Send + Sync {
    fn write(&self, entry: &LogEntry);
}

/// Central logger dispatching to its sinks. Built at startup, shared via
/// `Arc`, read-only afterwards.
pub struct EventLogger {
    sinks: Vec<Arc<dyn LogSink>>,
    min_level: LogLevel,
}

impl EventLogger {
    pub fn new() -> Self {
        Self {
            sinks: Vec::new(),
            min_level: LogLevel::Debug,
        }
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    pub fn add_sink(&mut self, sink: Arc<dyn LogSink>) {
        self.sinks.push(sink);
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    pub fn log(&self, entry: &LogEntry) {
        if entry.level < self.min_level {
            return;
        }
        for sink in &self.sinks {
            sink.write(entry);
        }
    }

    pub fn debug(&self, source: &str, message: &str) {
        self.log(&LogEntry::new(LogLevel::Debug, source, message));
    }

    pub fn info(&self, source: &str, message: &str) {
        self.log(&LogEntry::new(LogLevel::Info, source, message));
    }

    pub fn warn(&self, source: &str, message: &str) {
        self.log(&LogEntry::new(LogLevel::Warn, source, message));
    }

    pub fn error(&self, source: &str, message: &str) {
        self.log(&LogEntry::new(LogLevel::Error, source, message));
    }
}

impl Default for EventLogger {
    fn default() -> Self {
        Self::new()
    }
}

/// Sink that writes formatted lines to stdout.
pub struct StdoutSink;

impl LogSink for StdoutSink {
    fn write(&self, entry: &LogEntry) {
        println!("{}", entry.format_line());
    }
}

/// Sink that collects entries in memory, for tests and inspection.
pub struct MemorySink {
    entries: std::sync::Mutex<Vec<LogEntry>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self {
            entries: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new()
    }
}

impl LogSink for MemorySink {
    fn write(&self, entry: &LogEntry) {
        self.entries.lock().unwrap().push(entry.clone());
    }
}
