// crates/swarmgate-testdata/src/service.rs
// ============================================================================
// Module: Test Data Producer Service
// Description: Endpoint task that serves data requests from workers.
// Purpose: Gate replies on the spawn barrier and route them as messages.
// Dependencies: swarmgate-core, serde_json, tokio
// ============================================================================

//! ## Overview
//! [`ProducerService::spawn`] starts the producer endpoint. Requests arrive on
//! an unbounded channel; each one is served on its own task so a slow or
//! gated request never blocks the receive loop. Replies travel back to the
//! requesting worker as `consume_testdata` messages.
//! Invariants:
//! - No reply is sent while the spawn barrier is locked.
//! - Every request accepted before shutdown produces at most one reply.
//! - No record is drawn once shutdown has been requested.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use swarmgate_core::CONSUME_TESTDATA;
use swarmgate_core::Destination;
use swarmgate_core::MessageName;
use swarmgate_core::RunLog;
use swarmgate_core::RunLogEvent;
use swarmgate_core::SpawnBarrier;
use swarmgate_core::Transport;
use swarmgate_core::TransportError;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::task::JoinSet;

use crate::consumer::ProducerLink;
use crate::messages::DataReply;
use crate::messages::DataRequest;
use crate::messages::DataResponse;
use crate::pool::DataOutcome;
use crate::pool::PoolSummary;
use crate::producer::TestdataProducer;

// ============================================================================
// SECTION: Service
// ============================================================================

/// Shared dependencies of every request task.
#[derive(Clone)]
struct ServiceContext {
    /// Pool owner.
    producer: Arc<TestdataProducer>,
    /// Barrier gating every reply.
    barrier: Arc<SpawnBarrier>,
    /// Outbound message route.
    transport: Arc<dyn Transport>,
    /// Run log for delivery failures.
    log: Arc<dyn RunLog>,
    /// Set once shutdown is requested.
    closed: Arc<AtomicBool>,
}

/// Producer endpoint launcher.
pub struct ProducerService;

impl ProducerService {
    /// Starts the endpoint on the current tokio runtime.
    #[must_use]
    pub fn spawn(
        producer: Arc<TestdataProducer>,
        barrier: Arc<SpawnBarrier>,
        transport: Arc<dyn Transport>,
        log: Arc<dyn RunLog>,
    ) -> ProducerHandle {
        let (sender, mut receiver) = mpsc::unbounded_channel::<DataRequest>();
        let closed = Arc::new(AtomicBool::new(false));
        let context = ServiceContext {
            producer: Arc::clone(&producer),
            barrier,
            transport,
            log,
            closed: Arc::clone(&closed),
        };
        // Aborting the loop drops the set and aborts every request task.
        let task = tokio::spawn(async move {
            let mut inflight = JoinSet::new();
            while let Some(request) = receiver.recv().await {
                while inflight.try_join_next().is_some() {}
                let context = context.clone();
                inflight.spawn(async move {
                    serve(&context, request).await;
                });
            }
            while inflight.join_next().await.is_some() {}
        });
        ProducerHandle {
            sender,
            task,
            producer,
            closed,
        }
    }
}

/// Serves one request once the barrier is open.
async fn serve(context: &ServiceContext, request: DataRequest) {
    context.barrier.wait_unlocked().await;
    if context.closed.load(Ordering::Acquire) {
        return;
    }
    let reply = match context.producer.request(&request.scenario, &request.worker) {
        Ok(DataOutcome::Record(record)) => DataReply::Record {
            record,
        },
        Ok(DataOutcome::Exhausted) => DataReply::Exhausted,
        Err(err) => DataReply::Failed {
            reason: err.to_string(),
        },
    };
    let response = DataResponse {
        correlation_id: request.correlation_id,
        scenario: request.scenario.clone(),
        reply,
    };
    let delivered = serde_json::to_value(&response)
        .map_err(|err| TransportError::SendFailed(err.to_string()))
        .and_then(|payload| {
            context.transport.send(
                &Destination::Worker(request.worker.clone()),
                &MessageName::new(CONSUME_TESTDATA),
                payload,
            )
        });
    if let Err(err) = delivered {
        context.log.record(
            &RunLogEvent::warn(
                "testdata_reply_failed",
                format!("failed to deliver test data to {}: {err}", request.worker),
            )
            .with_scenario(request.scenario.as_str())
            .with_node(request.worker.as_str()),
        );
    }
}

// ============================================================================
// SECTION: Handle
// ============================================================================

/// Handle to a running producer endpoint.
pub struct ProducerHandle {
    /// Request channel into the endpoint.
    sender: mpsc::UnboundedSender<DataRequest>,
    /// Receive loop task.
    task: JoinHandle<()>,
    /// Pool owner, kept for accounting.
    producer: Arc<TestdataProducer>,
    /// Shared with every request task.
    closed: Arc<AtomicBool>,
}

impl ProducerHandle {
    /// Returns hand-out accounting for every pool.
    #[must_use]
    pub fn summary(&self) -> Vec<PoolSummary> {
        self.producer.summary()
    }

    /// Returns the producer behind this endpoint.
    #[must_use]
    pub fn producer(&self) -> Arc<TestdataProducer> {
        Arc::clone(&self.producer)
    }

    /// Stops accepting requests; requests still waiting on the barrier are
    /// dropped without drawing a record.
    pub fn shutdown(&self) {
        self.closed.store(true, Ordering::Release);
        self.task.abort();
    }

    /// Returns true once shutdown was requested or the receive loop ended.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.closed.load(Ordering::Acquire) || self.task.is_finished()
    }
}

impl ProducerLink for ProducerHandle {
    fn submit(&self, request: DataRequest) -> Result<(), TransportError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::SendFailed("test data producer stopped".to_string()));
        }
        self.sender
            .send(request)
            .map_err(|_| TransportError::SendFailed("test data producer stopped".to_string()))
    }
}

impl Drop for ProducerHandle {
    fn drop(&mut self) {
        self.closed.store(true, Ordering::Release);
        self.task.abort();
    }
}
