// crates/swarmgate-core/src/interfaces.rs
// ============================================================================
// Module: Swarmgate Interfaces
// Description: Seams to the external transport and message handlers.
// Purpose: Keep framing and delivery outside the core while routing by name.
// Dependencies: async-trait, serde_json, thiserror
// ============================================================================

//! ## Overview
//! The transport is an external collaborator: it delivers opaque named
//! messages to the handler registered for that name. Delivery order is not
//! part of the contract; replies are paired with requests by correlation id.
//! Swarmgate only hands it an effective [`HandlerTable`] and asks it to send
//! payloads to a [`Destination`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::identifiers::MessageName;
use crate::identifiers::NodeId;
use crate::message::Destination;
use crate::message::Message;
use crate::registry::HandlerTable;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised by transports.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Destination node is not connected.
    #[error("unknown destination node: {0}")]
    UnknownNode(String),
    /// Destination has no handler for the message name.
    #[error("no handler registered for message {name} on node {node}")]
    UnknownMessage {
        /// Destination node.
        node: String,
        /// Message name.
        name: String,
    },
    /// Transport is closed or could not deliver the message.
    #[error("transport send failed: {0}")]
    SendFailed(String),
}

/// Errors raised by message handlers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandlerError {
    /// Payload did not decode into the expected message body.
    #[error("malformed {name} payload: {reason}")]
    MalformedPayload {
        /// Message name.
        name: String,
        /// Decoder failure.
        reason: String,
    },
    /// Reply could not be sent.
    #[error("handler reply failed: {0}")]
    Reply(#[from] TransportError),
    /// Handler-specific failure.
    #[error("handler failed: {0}")]
    Failed(String),
}

// ============================================================================
// SECTION: Handler Trait
// ============================================================================

/// Handles one named message delivered by the transport.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Handles the message.
    ///
    /// # Errors
    ///
    /// Returns [`HandlerError`] when the payload is malformed or a reply
    /// cannot be sent.
    async fn handle(&self, message: Message) -> Result<(), HandlerError>;
}

/// Handler backed by a synchronous closure.
pub struct FnHandler<F> {
    /// Callback invoked per message.
    callback: F,
}

#[async_trait]
impl<F> MessageHandler for FnHandler<F>
where
    F: Fn(Message) -> Result<(), HandlerError> + Send + Sync,
{
    async fn handle(&self, message: Message) -> Result<(), HandlerError> {
        (self.callback)(message)
    }
}

/// Wraps a closure as a shareable [`MessageHandler`].
#[must_use]
pub fn handler_fn<F>(callback: F) -> Arc<dyn MessageHandler>
where
    F: Fn(Message) -> Result<(), HandlerError> + Send + Sync + 'static,
{
    Arc::new(FnHandler {
        callback,
    })
}

// ============================================================================
// SECTION: Transport Trait
// ============================================================================

/// Message transport owned by the surrounding runner.
pub trait Transport: Send + Sync {
    /// Returns the identifier of the local node.
    fn node_id(&self) -> &NodeId;

    /// Installs the effective handler table, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the transport cannot accept handlers.
    fn attach(&self, table: HandlerTable) -> Result<(), TransportError>;

    /// Sends a named payload to a destination.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the message cannot be delivered.
    fn send(
        &self,
        destination: &Destination,
        name: &MessageName,
        payload: Value,
    ) -> Result<(), TransportError>;
}
