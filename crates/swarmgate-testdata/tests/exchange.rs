// crates/swarmgate-testdata/tests/exchange.rs
// ============================================================================
// Module: Test Data Exchange Tests
// Description: End-to-end tests for producer service and worker consumers.
// Purpose: Validate barrier gating, uniqueness, and reply correlation.
// Dependencies: swarmgate-testdata, swarmgate-core, tokio
// ============================================================================
//! ## Overview
//! Wires a [`swarmgate_testdata::ProducerService`] to consumers through a
//! loopback transport that decodes `consume_testdata` payloads.

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
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use serde_json::Value;
use serde_json::json;
use swarmgate_core::CorrelationId;
use swarmgate_core::Destination;
use swarmgate_core::HandlerTable;
use swarmgate_core::MemoryRunLog;
use swarmgate_core::Message;
use swarmgate_core::MessageHandler;
use swarmgate_core::MessageName;
use swarmgate_core::NodeId;
use swarmgate_core::NoopRunLog;
use swarmgate_core::ScenarioId;
use swarmgate_core::SpawnBarrier;
use swarmgate_core::Transport;
use swarmgate_core::TransportError;
use swarmgate_testdata::ConsumeTestdataHandler;
use swarmgate_testdata::ConsumerError;
use swarmgate_testdata::DataOutcome;
use swarmgate_testdata::DataReply;
use swarmgate_testdata::DataRequest;
use swarmgate_testdata::DataResponse;
use swarmgate_testdata::PoolPlan;
use swarmgate_testdata::ProducerHandle;
use swarmgate_testdata::ProducerLink;
use swarmgate_testdata::ProducerService;
use swarmgate_testdata::TestdataConsumer;
use swarmgate_testdata::TestdataProducer;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Transport that hands worker-bound messages to registered consumers.
struct LoopbackTransport {
    /// Master node id.
    node: NodeId,
    /// Consumers keyed by worker id.
    consumers: Mutex<HashMap<NodeId, Arc<TestdataConsumer>>>,
}

impl LoopbackTransport {
    /// Creates a transport for the master node.
    fn new() -> Self {
        Self {
            node: NodeId::new("master"),
            consumers: Mutex::new(HashMap::new()),
        }
    }

    /// Registers a consumer for its worker.
    fn register(&self, consumer: Arc<TestdataConsumer>) {
        self.consumers.lock().unwrap().insert(consumer.worker().clone(), consumer);
    }
}

impl Transport for LoopbackTransport {
    fn node_id(&self) -> &NodeId {
        &self.node
    }

    fn attach(&self, _table: HandlerTable) -> Result<(), TransportError> {
        Ok(())
    }

    fn send(
        &self,
        destination: &Destination,
        name: &MessageName,
        payload: Value,
    ) -> Result<(), TransportError> {
        let Destination::Worker(worker) = destination else {
            return Err(TransportError::UnknownNode("master".to_string()));
        };
        let consumer = self
            .consumers
            .lock()
            .unwrap()
            .get(worker)
            .cloned()
            .ok_or_else(|| TransportError::UnknownNode(worker.to_string()))?;
        let message = Message::new(name.clone(), self.node.clone(), payload);
        tokio::spawn(async move {
            ConsumeTestdataHandler::new(consumer).handle(message).await.unwrap();
        });
        Ok(())
    }
}

/// Running producer endpoint plus its transport.
struct Harness {
    /// Barrier gating replies.
    barrier: Arc<SpawnBarrier>,
    /// Loopback route for replies.
    transport: Arc<LoopbackTransport>,
    /// Producer endpoint.
    handle: Arc<ProducerHandle>,
}

impl Harness {
    /// Starts a producer over the given plans with a locked barrier.
    fn start(plans: &[PoolPlan]) -> Self {
        let barrier = Arc::new(SpawnBarrier::new());
        let transport = Arc::new(LoopbackTransport::new());
        let producer = Arc::new(TestdataProducer::new(plans, Arc::new(NoopRunLog)).unwrap());
        let handle = Arc::new(ProducerService::spawn(
            producer,
            Arc::clone(&barrier),
            transport.clone(),
            Arc::new(NoopRunLog),
        ));
        Self {
            barrier,
            transport,
            handle,
        }
    }

    /// Creates and registers a consumer for a worker.
    fn consumer(&self, worker: &str, timeout: Duration) -> Arc<TestdataConsumer> {
        let link: Arc<dyn ProducerLink> = self.handle.clone();
        let consumer = Arc::new(TestdataConsumer::new(
            NodeId::new(worker),
            Some(link),
            timeout,
            Arc::new(NoopRunLog),
        ));
        self.transport.register(Arc::clone(&consumer));
        consumer
    }
}

/// Link that accepts requests and never answers.
struct SilentLink;

impl ProducerLink for SilentLink {
    fn submit(&self, _request: DataRequest) -> Result<(), TransportError> {
        Ok(())
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

/// Tests no record is served while the spawn barrier is locked.
#[tokio::test]
async fn replies_wait_for_barrier_release() {
    let harness = Harness::start(&[PoolPlan::inline("001", vec![json!({ "id": 1 })])]);
    let consumer = harness.consumer("worker-1", Duration::from_secs(5));
    let scenario = ScenarioId::new("001");

    let request = {
        let consumer = Arc::clone(&consumer);
        tokio::spawn(async move { consumer.request(&scenario).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!request.is_finished());
    assert_eq!(harness.handle.summary()[0].served, 0);

    assert!(harness.barrier.release(1));
    let outcome = request.await.unwrap().unwrap();
    assert_eq!(outcome, DataOutcome::Record(json!({ "id": 1 })));
}

/// Tests shutdown drops requests parked on the barrier without drawing records.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn shutdown_leaves_parked_requests_undrawn() {
    let harness =
        Harness::start(&[PoolPlan::inline("001", vec![json!({ "id": 1 }), json!({ "id": 2 })])]);
    let consumer = harness.consumer("worker-1", Duration::from_secs(5));
    let parked = {
        let consumer = Arc::clone(&consumer);
        tokio::spawn(async move { consumer.request(&ScenarioId::new("001")).await })
    };
    while consumer.outstanding() == 0 {
        tokio::task::yield_now().await;
    }
    tokio::time::sleep(Duration::from_millis(20)).await;

    harness.handle.shutdown();
    assert!(harness.handle.is_stopped());
    assert!(harness.barrier.force_release());
    tokio::time::sleep(Duration::from_millis(100)).await;

    let summary = &harness.handle.summary()[0];
    assert_eq!(summary.served, 0);
    assert_eq!(summary.remaining, Some(2));
    assert_eq!(consumer.cancel_all(), 1);
    assert_eq!(parked.await.unwrap(), Err(ConsumerError::Cancelled));

    let rejected = consumer.request(&ScenarioId::new("001")).await;
    assert!(matches!(rejected, Err(ConsumerError::Transport(_))));
}

/// Tests concurrent requests never receive the same record twice.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_receive_distinct_records() {
    let records: Vec<Value> = (0..20).map(|index| json!({ "id": index })).collect();
    let harness = Harness::start(&[PoolPlan::inline("001", records)]);
    assert!(harness.barrier.release(4));

    let mut tasks = Vec::new();
    for worker in 0..4 {
        let consumer = harness.consumer(&format!("worker-{worker}"), Duration::from_secs(5));
        for _ in 0..10 {
            let consumer = Arc::clone(&consumer);
            tasks.push(tokio::spawn(async move {
                consumer.request(&ScenarioId::new("001")).await.unwrap()
            }));
        }
    }

    let mut seen = BTreeSet::new();
    let mut exhausted = 0;
    for task in tasks {
        match task.await.unwrap() {
            DataOutcome::Record(record) => {
                assert!(seen.insert(record["id"].as_u64().unwrap()), "record served twice");
            }
            DataOutcome::Exhausted => exhausted += 1,
        }
    }
    assert_eq!(seen.len(), 20);
    assert_eq!(exhausted, 20);
}

/// Tests an unknown scenario surfaces as a producer failure.
#[tokio::test]
async fn unknown_scenario_is_a_producer_failure() {
    let harness = Harness::start(&[PoolPlan::inline("001", vec![json!(1)])]);
    harness.barrier.force_release();
    let consumer = harness.consumer("worker-1", Duration::from_secs(5));
    let err = consumer.request(&ScenarioId::new("404")).await.unwrap_err();
    assert!(matches!(err, ConsumerError::Producer(reason) if reason.contains("404")));
}

/// Tests a consumer with no producer logs and fails fast.
#[tokio::test]
async fn missing_producer_logs_no_test_data() {
    let log = Arc::new(MemoryRunLog::new());
    let consumer =
        TestdataConsumer::new(NodeId::new("worker-1"), None, Duration::from_secs(1), log.clone());
    let err = consumer.request(&ScenarioId::new("001")).await.unwrap_err();
    assert_eq!(err, ConsumerError::NoProducer);
    assert_eq!(log.count_containing("there is no test data"), 1);
}

/// Tests an unanswered request times out and leaves no waiter behind.
#[tokio::test]
async fn unanswered_request_times_out() {
    let consumer = TestdataConsumer::new(
        NodeId::new("worker-1"),
        Some(Arc::new(SilentLink)),
        Duration::from_millis(20),
        Arc::new(NoopRunLog),
    );
    let err = consumer.request(&ScenarioId::new("001")).await.unwrap_err();
    assert_eq!(err, ConsumerError::Timeout(Duration::from_millis(20)));
    assert_eq!(consumer.outstanding(), 0);
}

/// Tests cancellation resolves every outstanding request.
#[tokio::test]
async fn cancel_all_resolves_outstanding_requests() {
    let consumer = Arc::new(TestdataConsumer::new(
        NodeId::new("worker-1"),
        Some(Arc::new(SilentLink)),
        Duration::from_secs(30),
        Arc::new(NoopRunLog),
    ));
    let tasks: Vec<_> = (0..3)
        .map(|_| {
            let consumer = Arc::clone(&consumer);
            tokio::spawn(async move { consumer.request(&ScenarioId::new("001")).await })
        })
        .collect();
    while consumer.outstanding() < 3 {
        tokio::task::yield_now().await;
    }
    assert_eq!(consumer.cancel_all(), 3);
    for task in tasks {
        assert_eq!(task.await.unwrap().unwrap_err(), ConsumerError::Cancelled);
    }
}

/// Tests replies with unknown correlation ids are dropped and logged.
#[tokio::test]
async fn orphan_responses_are_dropped() {
    let log = Arc::new(MemoryRunLog::new());
    let consumer = Arc::new(TestdataConsumer::new(
        NodeId::new("worker-1"),
        Some(Arc::new(SilentLink)),
        Duration::from_secs(1),
        log.clone(),
    ));
    let response = DataResponse {
        correlation_id: CorrelationId::from_raw(999),
        scenario: ScenarioId::new("001"),
        reply: DataReply::Exhausted,
    };
    assert!(!consumer.handle_response(response));
    assert_eq!(log.count_containing("no waiting request"), 1);
}

/// Tests malformed payloads are rejected by the handler.
#[tokio::test]
async fn malformed_payloads_are_rejected() {
    let consumer = Arc::new(TestdataConsumer::new(
        NodeId::new("worker-1"),
        None,
        Duration::from_secs(1),
        Arc::new(NoopRunLog),
    ));
    let handler = ConsumeTestdataHandler::new(consumer);
    let message = Message::new("consume_testdata", NodeId::new("master"), json!({ "bogus": true }));
    assert!(handler.handle(message).await.is_err());
}
