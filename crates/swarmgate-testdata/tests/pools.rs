// crates/swarmgate-testdata/tests/pools.rs
// ============================================================================
// Module: Scenario Pool Tests
// Description: Tests for pool ordering, cycling, sources, and accounting.
// Purpose: Validate record hand-out without the message path.
// Dependencies: swarmgate-testdata, swarmgate-core, proptest, tempfile
// ============================================================================
//! ## Overview
//! Exercises [`swarmgate_testdata::TestdataProducer`] and its pools directly.

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

use std::collections::BTreeSet;
use std::fs;
use std::sync::Arc;

use proptest::prelude::*;
use serde_json::Value;
use serde_json::json;
use swarmgate_core::MemoryRunLog;
use swarmgate_core::NodeId;
use swarmgate_core::NoopRunLog;
use swarmgate_core::ScenarioId;
use swarmgate_testdata::DataOutcome;
use swarmgate_testdata::DataSource;
use swarmgate_testdata::PoolOrder;
use swarmgate_testdata::PoolPlan;
use swarmgate_testdata::ProducerError;
use swarmgate_testdata::TestdataProducer;

/// Builds a producer with a single inline pool.
fn producer_with(plan: PoolPlan) -> TestdataProducer {
    TestdataProducer::new(&[plan], Arc::new(NoopRunLog)).unwrap()
}

/// Draws records until the pool reports exhaustion.
fn drain(producer: &TestdataProducer, scenario: &ScenarioId) -> Vec<Value> {
    let worker = NodeId::new("worker-1");
    let mut records = Vec::new();
    while let DataOutcome::Record(record) = producer.request(scenario, &worker).unwrap() {
        records.push(record);
    }
    records
}

proptest! {
    /// Tests sequential pools hand out every record once, in declared order.
    #[test]
    fn sequential_pool_preserves_declared_order(values in prop::collection::vec(any::<i64>(), 0..40)) {
        let records: Vec<Value> = values.iter().map(|value| json!({ "value": value })).collect();
        let producer = producer_with(PoolPlan::inline("001", records.clone()));
        let scenario = ScenarioId::new("001");
        prop_assert_eq!(drain(&producer, &scenario), records);
        prop_assert_eq!(
            producer.request(&scenario, &NodeId::new("worker-2")).unwrap(),
            DataOutcome::Exhausted
        );
    }
}

/// Tests random pools are a permutation of their records.
#[test]
fn random_pool_is_a_permutation() {
    let records: Vec<Value> = (0..50).map(|index| json!(index)).collect();
    let producer =
        producer_with(PoolPlan::inline("002", records.clone()).with_order(PoolOrder::Random));
    let drawn = drain(&producer, &ScenarioId::new("002"));
    assert_eq!(drawn.len(), records.len());
    let drawn_set: BTreeSet<String> = drawn.iter().map(Value::to_string).collect();
    let expected_set: BTreeSet<String> = records.iter().map(Value::to_string).collect();
    assert_eq!(drawn_set, expected_set);
}

/// Tests cyclic pools wrap around and never exhaust.
#[test]
fn cyclic_pool_wraps_around() {
    let producer = producer_with(
        PoolPlan::inline("003", vec![json!("a"), json!("b"), json!("c")]).with_cyclic(true),
    );
    let scenario = ScenarioId::new("003");
    let worker = NodeId::new("worker-1");
    let drawn: Vec<Value> = (0..7)
        .map(|_| producer.request(&scenario, &worker).unwrap().into_record().unwrap())
        .collect();
    assert_eq!(drawn, vec![
        json!("a"),
        json!("b"),
        json!("c"),
        json!("a"),
        json!("b"),
        json!("c"),
        json!("a")
    ]);
    let summary = producer.summary();
    assert_eq!(summary[0].served, 7);
    assert_eq!(summary[0].remaining, None);
}

/// Tests an empty cyclic pool reports exhaustion instead of looping.
#[test]
fn empty_cyclic_pool_is_exhausted() {
    let producer = producer_with(PoolPlan::inline("004", Vec::new()).with_cyclic(true));
    assert!(producer.request(&ScenarioId::new("004"), &NodeId::new("w")).unwrap().is_exhausted());
}

/// Tests pools are isolated from one another.
#[test]
fn pools_are_independent_per_scenario() {
    let producer = TestdataProducer::new(
        &[PoolPlan::inline("a", vec![json!(1)]), PoolPlan::inline("b", vec![json!(2), json!(3)])],
        Arc::new(NoopRunLog),
    )
    .unwrap();
    assert_eq!(drain(&producer, &ScenarioId::new("a")), vec![json!(1)]);
    assert_eq!(drain(&producer, &ScenarioId::new("b")), vec![json!(2), json!(3)]);
    assert_eq!(producer.scenarios(), vec![ScenarioId::new("a"), ScenarioId::new("b")]);
}

/// Tests unknown scenarios and duplicate plans are rejected.
#[test]
fn unknown_and_duplicate_scenarios_are_rejected() {
    let producer = producer_with(PoolPlan::inline("a", vec![json!(1)]));
    let err = producer.request(&ScenarioId::new("missing"), &NodeId::new("w")).unwrap_err();
    assert_eq!(err, ProducerError::UnknownScenario("missing".to_string()));

    let duplicate = TestdataProducer::new(
        &[PoolPlan::inline("a", Vec::new()), PoolPlan::inline("a", Vec::new())],
        Arc::new(NoopRunLog),
    );
    assert!(matches!(duplicate, Err(ProducerError::DuplicateScenario(name)) if name == "a"));
}

/// Tests exhaustion is logged once per pool regardless of request count.
#[test]
fn exhaustion_is_logged_once() {
    let log = Arc::new(MemoryRunLog::new());
    let producer =
        TestdataProducer::new(&[PoolPlan::inline("005", vec![json!(1)])], log.clone()).unwrap();
    let scenario = ScenarioId::new("005");
    for _ in 0..5 {
        let _ = producer.request(&scenario, &NodeId::new("w")).unwrap();
    }
    assert_eq!(log.count_containing("005 has no more test data"), 1);
}

/// Tests per-worker accounting in the pool summary.
#[test]
fn summary_counts_records_per_worker() {
    let producer = producer_with(PoolPlan::inline("006", (0..5).map(|i| json!(i)).collect()));
    let scenario = ScenarioId::new("006");
    for worker in ["w1", "w2", "w1"] {
        let _ = producer.request(&scenario, &NodeId::new(worker)).unwrap();
    }
    let summary = &producer.summary()[0];
    assert_eq!(summary.total, 5);
    assert_eq!(summary.served, 3);
    assert_eq!(summary.remaining, Some(2));
    assert_eq!(summary.per_worker.get(&NodeId::new("w1")), Some(&2));
    assert_eq!(summary.per_worker.get(&NodeId::new("w2")), Some(&1));
}

/// Tests file sources are concatenated after inline records.
#[test]
fn file_sources_load_in_declaration_order() {
    let dir = tempfile::tempdir().unwrap();
    let array_path = dir.path().join("users.json");
    fs::write(&array_path, r#"[{"user":"alice"},{"user":"bob"}]"#).unwrap();
    let lines_path = dir.path().join("users.jsonl");
    fs::write(&lines_path, "{\"user\":\"carol\"}\n\n{\"user\":\"dave\"}\n").unwrap();

    let plan = PoolPlan::new("007", vec![
        DataSource::Inline {
            records: vec![json!({ "user": "root" })],
        },
        DataSource::JsonFile {
            path: array_path,
        },
        DataSource::JsonLinesFile {
            path: lines_path,
        },
    ]);
    let producer = producer_with(plan);
    let users: Vec<Value> =
        drain(&producer, &ScenarioId::new("007")).into_iter().map(|r| r["user"].clone()).collect();
    assert_eq!(users, vec![json!("root"), json!("alice"), json!("bob"), json!("carol"), json!("dave")]);
}

/// Tests malformed source files fail producer construction.
#[test]
fn malformed_sources_fail_construction() {
    let dir = tempfile::tempdir().unwrap();
    let object_path = dir.path().join("object.json");
    fs::write(&object_path, r#"{"user":"alice"}"#).unwrap();
    let plan = PoolPlan::new("008", vec![DataSource::JsonFile {
        path: object_path,
    }]);
    let err = TestdataProducer::new(&[plan], Arc::new(NoopRunLog)).err().unwrap();
    assert!(matches!(err, ProducerError::Source(reason) if reason.contains("JSON array")));

    let missing = PoolPlan::new("009", vec![DataSource::JsonLinesFile {
        path: dir.path().join("missing.jsonl"),
    }]);
    assert!(matches!(
        TestdataProducer::new(&[missing], Arc::new(NoopRunLog)),
        Err(ProducerError::Source(_))
    ));
}
