// crates/swarmgate-testdata/src/messages.rs
// ============================================================================
// Module: Test Data Messages
// Description: Request and response bodies exchanged with the producer.
// Purpose: Carry correlation ids so replies can arrive in any order.
// Dependencies: swarmgate-core, serde
// ============================================================================

//! ## Overview
//! Bodies are serialized into the opaque message payload; the transport
//! decides the wire encoding.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use swarmgate_core::CorrelationId;
use swarmgate_core::NodeId;
use swarmgate_core::ScenarioId;

// ============================================================================
// SECTION: Messages
// ============================================================================

/// Request for the next record of a scenario pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataRequest {
    /// Correlation id issued by the requesting consumer.
    pub correlation_id: CorrelationId,
    /// Scenario whose pool is consumed.
    pub scenario: ScenarioId,
    /// Worker the reply is routed to.
    pub worker: NodeId,
}

/// Producer reply for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataResponse {
    /// Correlation id copied from the request.
    pub correlation_id: CorrelationId,
    /// Scenario the reply belongs to.
    pub scenario: ScenarioId,
    /// Reply body.
    pub reply: DataReply,
}

/// Reply body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataReply {
    /// Next record of the pool.
    Record {
        /// Record value.
        record: Value,
    },
    /// The pool has no more records.
    Exhausted,
    /// The producer could not serve the request.
    Failed {
        /// Failure description.
        reason: String,
    },
}
