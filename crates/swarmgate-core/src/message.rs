// crates/swarmgate-core/src/message.rs
// ============================================================================
// Module: Swarmgate Messages
// Description: Named messages, routing directions, and destinations.
// Purpose: Describe what crosses the transport without defining a wire format.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! A [`Message`] is an opaque, named JSON payload stamped with the node that
//! sent it. Payload encoding on the wire is the transport's concern.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::identifiers::MessageName;
use crate::identifiers::NodeId;

// ============================================================================
// SECTION: Built-In Message Names
// ============================================================================

/// Master → worker: a test-data response for a pending consumer request.
pub const CONSUME_TESTDATA: &str = "consume_testdata";
/// Worker → master: a token request for an identity.
pub const PRODUCE_TOKEN: &str = "produce_token";
/// Master → worker: a token delivery (or refresh failure) for an identity.
pub const CONSUME_TOKEN: &str = "consume_token";

// ============================================================================
// SECTION: Direction
// ============================================================================

/// Direction a message travels; decides which role installs its handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Sent by a worker, handled by the master.
    WorkerToMaster,
    /// Sent by the master, handled by a worker.
    MasterToWorker,
}

impl Direction {
    /// Returns a stable label for the direction.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::WorkerToMaster => "worker_to_master",
            Self::MasterToWorker => "master_to_worker",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Destination
// ============================================================================

/// Addressing for an outbound message.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Destination {
    /// The master process of the run.
    Master,
    /// A specific worker process.
    Worker(NodeId),
}

// ============================================================================
// SECTION: Message
// ============================================================================

/// Named message delivered to a registered handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Message name used for handler lookup.
    pub name: MessageName,
    /// Node that sent the message.
    pub sender: NodeId,
    /// Opaque payload.
    pub payload: Value,
}

impl Message {
    /// Creates a message.
    #[must_use]
    pub fn new(name: impl Into<MessageName>, sender: NodeId, payload: Value) -> Self {
        Self {
            name: name.into(),
            sender,
            payload,
        }
    }
}
