// crates/swarmgate-core/tests/run_log.rs
// ============================================================================
// Module: Run Log Tests
// Description: Tests for structured run log sinks.
// Purpose: Validate JSON-line output and in-memory capture.
// Dependencies: swarmgate-core, serde_json, tempfile
// ============================================================================
//! ## Overview
//! Exercises [`swarmgate_core::RunLog`] sinks.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use serde_json::Value;
use swarmgate_core::FileRunLog;
use swarmgate_core::LogLevel;
use swarmgate_core::MemoryRunLog;
use swarmgate_core::RunLog;
use swarmgate_core::RunLogEvent;
use tempfile::tempdir;

/// Tests file log appends one JSON object per event.
#[test]
fn file_log_writes_json_lines() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("run.log");
    let log = FileRunLog::new(&path).unwrap();
    log.record(&RunLogEvent::error("testdata", "there is no test data"));
    log.record(&RunLogEvent::info("barrier", "spawning complete").with_node("master"));

    let contents = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<Value> =
        contents.lines().map(|line| serde_json::from_str(line).unwrap()).collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["level"], "error");
    assert_eq!(lines[0]["message"], "there is no test data");
    assert!(lines[0].get("node").is_none());
    assert_eq!(lines[1]["node"], "master");
}

/// Tests memory log filters by level and counts matches.
#[test]
fn memory_log_filters_by_level() {
    let log = MemoryRunLog::new();
    log.record(&RunLogEvent::info("run", "started"));
    log.record(&RunLogEvent::warn("run", "slow"));
    log.record(&RunLogEvent::error("validation", "x failed due to y").with_scenario("x"));

    assert_eq!(log.messages_at(LogLevel::Warn), vec!["slow", "x failed due to y"]);
    assert_eq!(log.count_containing("failed due to"), 1);
    assert_eq!(log.events()[2].scenario.as_deref(), Some("x"));
    log.clear();
    assert!(log.events().is_empty());
}
