// crates/swarmgate-testdata/src/consumer.rs
// ============================================================================
// Module: Test Data Consumer
// Description: Worker-side client for scenario pool records.
// Purpose: Request records and route correlated replies to waiting tasks.
// Dependencies: swarmgate-core, async-trait, serde_json, thiserror
// ============================================================================

//! ## Overview
//! [`TestdataConsumer::request`] registers a waiter, submits a
//! [`DataRequest`] through its [`ProducerLink`], and suspends only the calling
//! task until the matching `consume_testdata` reply arrives or the timeout
//! elapses. [`ConsumeTestdataHandler`] is the `consume_testdata` handler.
//! Invariants:
//! - Every request resolves: record, exhaustion, timeout, or cancellation.
//! - Requests are never retried; a timeout is surfaced to the caller.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use swarmgate_core::HandlerError;
use swarmgate_core::Message;
use swarmgate_core::MessageHandler;
use swarmgate_core::NodeId;
use swarmgate_core::PendingRequests;
use swarmgate_core::RunLog;
use swarmgate_core::RunLogEvent;
use swarmgate_core::ScenarioId;
use swarmgate_core::TransportError;
use swarmgate_core::WaitError;
use thiserror::Error;

use crate::messages::DataReply;
use crate::messages::DataRequest;
use crate::messages::DataResponse;
use crate::pool::DataOutcome;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors surfaced to a scenario asking for test data.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConsumerError {
    /// No producer is reachable from this process.
    #[error("there is no test data")]
    NoProducer,
    /// No reply arrived within the configured bound.
    #[error("test data request timed out after {0:?}")]
    Timeout(Duration),
    /// The run was aborted while the request was outstanding.
    #[error("test data request cancelled")]
    Cancelled,
    /// The request could not be submitted.
    #[error("test data request failed: {0}")]
    Transport(#[from] TransportError),
    /// The producer rejected the request.
    #[error("test data producer failed: {0}")]
    Producer(String),
}

impl From<WaitError> for ConsumerError {
    fn from(err: WaitError) -> Self {
        match err {
            WaitError::Timeout(timeout) => Self::Timeout(timeout),
            WaitError::Cancelled => Self::Cancelled,
        }
    }
}

// ============================================================================
// SECTION: Producer Link
// ============================================================================

/// Channel to a test-data producer.
pub trait ProducerLink: Send + Sync {
    /// Submits a request; the reply arrives later as `consume_testdata`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the request cannot be submitted.
    fn submit(&self, request: DataRequest) -> Result<(), TransportError>;
}

/// Resolves a remote producer address into a [`ProducerLink`].
pub trait ProducerConnector: Send + Sync {
    /// Connects to the producer at `address`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the address cannot be reached.
    fn connect(&self, address: &str) -> Result<Arc<dyn ProducerLink>, TransportError>;
}

// ============================================================================
// SECTION: Consumer
// ============================================================================

/// Worker-side test-data client.
pub struct TestdataConsumer {
    /// Worker the replies are routed to.
    worker: NodeId,
    /// Producer link; `None` when no producer exists.
    link: Option<Arc<dyn ProducerLink>>,
    /// Outstanding requests keyed by correlation id.
    pending: PendingRequests<DataReply>,
    /// Bound on each wait.
    timeout: Duration,
    /// Run log for operator-visible failures.
    log: Arc<dyn RunLog>,
}

impl TestdataConsumer {
    /// Creates a consumer for a worker.
    #[must_use]
    pub fn new(
        worker: NodeId,
        link: Option<Arc<dyn ProducerLink>>,
        timeout: Duration,
        log: Arc<dyn RunLog>,
    ) -> Self {
        Self {
            worker,
            link,
            pending: PendingRequests::new(),
            timeout,
            log,
        }
    }

    /// Returns the worker this consumer requests for.
    #[must_use]
    pub const fn worker(&self) -> &NodeId {
        &self.worker
    }

    /// Returns true when a producer link is configured.
    #[must_use]
    pub fn has_producer(&self) -> bool {
        self.link.is_some()
    }

    /// Requests the next record of a scenario pool.
    ///
    /// # Errors
    ///
    /// Returns [`ConsumerError`] when no producer exists, the request cannot
    /// be submitted, the producer fails, or the wait times out or is
    /// cancelled. Exhaustion is returned as [`DataOutcome::Exhausted`].
    pub async fn request(&self, scenario: &ScenarioId) -> Result<DataOutcome, ConsumerError> {
        let Some(link) = &self.link else {
            self.log.record(
                &RunLogEvent::error("testdata_missing", "there is no test data")
                    .with_scenario(scenario.as_str())
                    .with_node(self.worker.as_str()),
            );
            return Err(ConsumerError::NoProducer);
        };
        let waiter = self.pending.register()?;
        let request = DataRequest {
            correlation_id: waiter.id(),
            scenario: scenario.clone(),
            worker: self.worker.clone(),
        };
        if let Err(err) = link.submit(request) {
            self.pending.forget(waiter.id());
            return Err(err.into());
        }
        match self.pending.wait(waiter, self.timeout).await? {
            DataReply::Record {
                record,
            } => Ok(DataOutcome::Record(record)),
            DataReply::Exhausted => Ok(DataOutcome::Exhausted),
            DataReply::Failed {
                reason,
            } => Err(ConsumerError::Producer(reason)),
        }
    }

    /// Routes a reply to its waiter; returns false for unknown correlation ids.
    pub fn handle_response(&self, response: DataResponse) -> bool {
        let delivered = self.pending.complete(response.correlation_id, response.reply);
        if !delivered {
            self.log.record(
                &RunLogEvent::warn(
                    "testdata_orphan_response",
                    format!(
                        "dropping test data response {} with no waiting request",
                        response.correlation_id
                    ),
                )
                .with_scenario(response.scenario.as_str())
                .with_node(self.worker.as_str()),
            );
        }
        delivered
    }

    /// Cancels every outstanding request.
    pub fn cancel_all(&self) -> usize {
        self.pending.cancel_all()
    }

    /// Returns the number of outstanding requests.
    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.pending.len()
    }
}

// ============================================================================
// SECTION: Handler
// ============================================================================

/// `consume_testdata` handler installed on workers.
pub struct ConsumeTestdataHandler {
    /// Consumer receiving the replies.
    consumer: Arc<TestdataConsumer>,
}

impl ConsumeTestdataHandler {
    /// Creates the handler for a consumer.
    #[must_use]
    pub const fn new(consumer: Arc<TestdataConsumer>) -> Self {
        Self {
            consumer,
        }
    }
}

#[async_trait]
impl MessageHandler for ConsumeTestdataHandler {
    async fn handle(&self, message: Message) -> Result<(), HandlerError> {
        let response: DataResponse =
            serde_json::from_value(message.payload).map_err(|err| {
                HandlerError::MalformedPayload {
                    name: message.name.to_string(),
                    reason: err.to_string(),
                }
            })?;
        self.consumer.handle_response(response);
        Ok(())
    }
}
