// crates/swarmgate-core/src/log.rs
// ============================================================================
// Module: Swarmgate Run Logging
// Description: Structured run log events and sinks.
// Purpose: Emit operator-visible JSON-line logs without hard dependencies.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Components report through the [`RunLog`] trait. Events serialize as one
//! JSON object per line; the `message` field carries the operator-facing
//! wording (for example `there is no test data`), which tooling matches on.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Severity of a run log event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    /// Informational progress.
    Info,
    /// Degraded but recoverable condition.
    Warn,
    /// Operator-visible failure.
    Error,
}

/// Run log event payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunLogEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Severity.
    pub level: LogLevel,
    /// Human-readable message.
    pub message: String,
    /// Scenario the event concerns, when any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scenario: Option<String>,
    /// Node the event concerns, when any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node: Option<String>,
}

impl RunLogEvent {
    /// Creates an event with a consistent timestamp.
    #[must_use]
    pub fn new(event: &'static str, level: LogLevel, message: impl Into<String>) -> Self {
        let timestamp_ms =
            SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        Self {
            event,
            timestamp_ms,
            level,
            message: message.into(),
            scenario: None,
            node: None,
        }
    }

    /// Creates an info-level event.
    #[must_use]
    pub fn info(event: &'static str, message: impl Into<String>) -> Self {
        Self::new(event, LogLevel::Info, message)
    }

    /// Creates a warn-level event.
    #[must_use]
    pub fn warn(event: &'static str, message: impl Into<String>) -> Self {
        Self::new(event, LogLevel::Warn, message)
    }

    /// Creates an error-level event.
    #[must_use]
    pub fn error(event: &'static str, message: impl Into<String>) -> Self {
        Self::new(event, LogLevel::Error, message)
    }

    /// Attaches a scenario name.
    #[must_use]
    pub fn with_scenario(mut self, scenario: impl Into<String>) -> Self {
        self.scenario = Some(scenario.into());
        self
    }

    /// Attaches a node identifier.
    #[must_use]
    pub fn with_node(mut self, node: impl Into<String>) -> Self {
        self.node = Some(node.into());
        self
    }
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Sink for run log events.
pub trait RunLog: Send + Sync {
    /// Records an event.
    fn record(&self, event: &RunLogEvent);
}

/// Run log that writes JSON lines to stderr.
pub struct StderrRunLog;

impl RunLog for StderrRunLog {
    fn record(&self, event: &RunLogEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Run log that appends JSON lines to a file.
pub struct FileRunLog {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileRunLog {
    /// Opens the log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl RunLog for FileRunLog {
    fn record(&self, event: &RunLogEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// Run log that keeps events in memory.
#[derive(Debug, Default)]
pub struct MemoryRunLog {
    /// Captured events in arrival order.
    events: Mutex<Vec<RunLogEvent>>,
}

impl MemoryRunLog {
    /// Creates an empty in-memory log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the captured events.
    #[must_use]
    pub fn events(&self) -> Vec<RunLogEvent> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }

    /// Returns the messages of events at or above `level`.
    #[must_use]
    pub fn messages_at(&self, level: LogLevel) -> Vec<String> {
        self.events()
            .into_iter()
            .filter(|event| event.level >= level)
            .map(|event| event.message)
            .collect()
    }

    /// Counts events whose message contains `needle`.
    #[must_use]
    pub fn count_containing(&self, needle: &str) -> usize {
        self.events().iter().filter(|event| event.message.contains(needle)).count()
    }

    /// Drops all captured events.
    pub fn clear(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }
}

impl RunLog for MemoryRunLog {
    fn record(&self, event: &RunLogEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

/// No-op run log.
pub struct NoopRunLog;

impl RunLog for NoopRunLog {
    fn record(&self, _event: &RunLogEvent) {}
}
