// crates/swarmgate-runtime/src/hub.rs
// ============================================================================
// Module: In-Process Hub
// Description: Transport connecting a master and named workers in one process.
// Purpose: Run local mode and exercise role wiring without sockets.
// Dependencies: swarmgate-core, swarmgate-testdata, tokio
// ============================================================================

//! ## Overview
//! Each node attaches its effective [`HandlerTable`] through a
//! [`HubTransport`]. Sending looks up the destination's table and runs the
//! handler on a spawned task, so a handler that awaits (a token refresh, a
//! barrier-gated reply) never blocks the sender. Delivery order between two
//! messages is therefore not guaranteed; correlation ids carry the pairing.
//! The hub also publishes producer endpoints by address, acting as the
//! [`ProducerConnector`] for workers.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;

use serde_json::Value;
use swarmgate_core::Destination;
use swarmgate_core::HandlerTable;
use swarmgate_core::Message;
use swarmgate_core::MessageName;
use swarmgate_core::NodeId;
use swarmgate_core::RunLog;
use swarmgate_core::RunLogEvent;
use swarmgate_core::Transport;
use swarmgate_core::TransportError;
use swarmgate_testdata::ProducerConnector;
use swarmgate_testdata::ProducerLink;

// ============================================================================
// SECTION: Hub
// ============================================================================

/// Message hub shared by every node of an in-process run.
pub struct InProcessHub {
    /// Node addressed by [`Destination::Master`].
    master: NodeId,
    /// Attached handler tables keyed by node.
    tables: Mutex<HashMap<NodeId, HandlerTable>>,
    /// Producer endpoints keyed by address.
    producers: Mutex<HashMap<String, Arc<dyn ProducerLink>>>,
    /// Run log for handler failures.
    log: Arc<dyn RunLog>,
}

impl InProcessHub {
    /// Creates a hub whose master is `master`.
    #[must_use]
    pub fn new(master: impl Into<NodeId>, log: Arc<dyn RunLog>) -> Arc<Self> {
        Arc::new(Self {
            master: master.into(),
            tables: Mutex::new(HashMap::new()),
            producers: Mutex::new(HashMap::new()),
            log,
        })
    }

    /// Returns a transport endpoint for `node`.
    #[must_use]
    pub fn transport(self: &Arc<Self>, node: impl Into<NodeId>) -> Arc<HubTransport> {
        Arc::new(HubTransport {
            hub: Arc::clone(self),
            node: node.into(),
        })
    }

    /// Returns a copy of the table attached for `node`.
    #[must_use]
    pub fn table(&self, node: &NodeId) -> Option<HandlerTable> {
        self.tables.lock().ok().and_then(|tables| tables.get(node).cloned())
    }

    /// Removes the table of `node`; later sends to it fail.
    pub fn detach(&self, node: &NodeId) -> bool {
        self.tables.lock().is_ok_and(|mut tables| tables.remove(node).is_some())
    }

    /// Publishes a producer endpoint under `address`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::SendFailed`] when the registry lock is poisoned.
    pub fn publish_producer(
        &self,
        address: impl Into<String>,
        link: Arc<dyn ProducerLink>,
    ) -> Result<(), TransportError> {
        let mut producers = self
            .producers
            .lock()
            .map_err(|_| TransportError::SendFailed("producer registry poisoned".to_string()))?;
        producers.insert(address.into(), link);
        Ok(())
    }

    /// Installs `table` for `node`.
    fn attach(&self, node: &NodeId, table: HandlerTable) -> Result<(), TransportError> {
        let mut tables = self
            .tables
            .lock()
            .map_err(|_| TransportError::SendFailed("handler tables poisoned".to_string()))?;
        tables.insert(node.clone(), table);
        Ok(())
    }

    /// Routes one message to the destination's handler on a spawned task.
    fn dispatch(
        &self,
        sender: &NodeId,
        destination: &Destination,
        name: &MessageName,
        payload: Value,
    ) -> Result<(), TransportError> {
        let target = match destination {
            Destination::Master => &self.master,
            Destination::Worker(node) => node,
        };
        let handler = {
            let tables = self
                .tables
                .lock()
                .map_err(|_| TransportError::SendFailed("handler tables poisoned".to_string()))?;
            let table =
                tables.get(target).ok_or_else(|| TransportError::UnknownNode(target.to_string()))?;
            let entry = table.get(name).ok_or_else(|| TransportError::UnknownMessage {
                node: target.to_string(),
                name: name.to_string(),
            })?;
            Arc::clone(&entry.handler)
        };
        let message = Message::new(name.clone(), sender.clone(), payload);
        let log = Arc::clone(&self.log);
        let target = target.clone();
        tokio::spawn(async move {
            let name = message.name.clone();
            if let Err(err) = handler.handle(message).await {
                log.record(
                    &RunLogEvent::warn("handler_failed", format!("{name} handler failed: {err}"))
                        .with_node(target.as_str()),
                );
            }
        });
        Ok(())
    }
}

impl ProducerConnector for InProcessHub {
    fn connect(&self, address: &str) -> Result<Arc<dyn ProducerLink>, TransportError> {
        let producers = self
            .producers
            .lock()
            .map_err(|_| TransportError::SendFailed("producer registry poisoned".to_string()))?;
        producers.get(address).cloned().ok_or_else(|| TransportError::UnknownNode(address.to_string()))
    }
}

// ============================================================================
// SECTION: Transport
// ============================================================================

/// One node's view of the hub.
pub struct HubTransport {
    /// Shared hub.
    hub: Arc<InProcessHub>,
    /// Node this endpoint sends from.
    node: NodeId,
}

impl Transport for HubTransport {
    fn node_id(&self) -> &NodeId {
        &self.node
    }

    fn attach(&self, table: HandlerTable) -> Result<(), TransportError> {
        self.hub.attach(&self.node, table)
    }

    fn send(
        &self,
        destination: &Destination,
        name: &MessageName,
        payload: Value,
    ) -> Result<(), TransportError> {
        self.hub.dispatch(&self.node, destination, name, payload)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
