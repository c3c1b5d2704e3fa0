// crates/swarmgate-auth/src/client.rs
// ============================================================================
// Module: Worker Token Client
// Description: Worker-side token cache fed by master deliveries.
// Purpose: Reuse local tokens and ask the master only near expiry.
// Dependencies: swarmgate-core, async-trait, serde_json
// ============================================================================

//! ## Overview
//! [`TokenClient::token`] serves from the worker-local cache while a token is
//! fresh. Otherwise it sends `produce_token` to the master and waits for the
//! correlated `consume_token` delivery, which [`ConsumeTokenHandler`] installs
//! into the cache before waking the waiter.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use swarmgate_core::Clock;
use swarmgate_core::Destination;
use swarmgate_core::HandlerError;
use swarmgate_core::Identity;
use swarmgate_core::Message;
use swarmgate_core::MessageHandler;
use swarmgate_core::MessageName;
use swarmgate_core::NodeId;
use swarmgate_core::PRODUCE_TOKEN;
use swarmgate_core::PendingRequests;
use swarmgate_core::RunLog;
use swarmgate_core::RunLogEvent;
use swarmgate_core::Transport;
use swarmgate_core::WaitError;

use crate::messages::TokenDelivery;
use crate::messages::TokenOutcome;
use crate::messages::TokenRequest;
use crate::token::AccessToken;
use crate::token::TokenError;
use crate::token::TokenPolicy;

// ============================================================================
// SECTION: Client
// ============================================================================

/// Worker-side token cache and requester.
pub struct TokenClient {
    /// Route to the master.
    transport: Arc<dyn Transport>,
    /// Time source for freshness checks.
    clock: Arc<dyn Clock>,
    /// Refresh margin shared with the master.
    policy: TokenPolicy,
    /// Tokens delivered to this worker.
    cache: Mutex<HashMap<Identity, AccessToken>>,
    /// Outstanding requests keyed by correlation id.
    pending: PendingRequests<TokenDelivery>,
    /// Bound on each wait.
    timeout: Duration,
    /// Run log for orphan deliveries.
    log: Arc<dyn RunLog>,
}

impl TokenClient {
    /// Creates a client sending through `transport`.
    #[must_use]
    pub fn new(
        transport: Arc<dyn Transport>,
        clock: Arc<dyn Clock>,
        policy: TokenPolicy,
        timeout: Duration,
        log: Arc<dyn RunLog>,
    ) -> Self {
        Self {
            transport,
            clock,
            policy,
            cache: Mutex::new(HashMap::new()),
            pending: PendingRequests::new(),
            timeout,
            log,
        }
    }

    /// Returns the node this client runs on.
    #[must_use]
    pub fn node(&self) -> &NodeId {
        self.transport.node_id()
    }

    /// Returns a token for `identity`.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::RefreshFailed`] when the master reports a failed
    /// refresh, [`TokenError::Timeout`] or [`TokenError::Cancelled`] when the
    /// wait ends without a delivery, and [`TokenError::Transport`] when the
    /// request cannot be sent.
    pub async fn token(&self, identity: &Identity) -> Result<AccessToken, TokenError> {
        if let Some(token) = self.cached(identity)?
            && token.is_fresh(self.clock.now_ms(), self.policy.refresh_margin_ms)
        {
            return Ok(token);
        }
        let waiter = self.pending.register().map_err(wait_error)?;
        let request = TokenRequest {
            correlation_id: waiter.id(),
            identity: identity.clone(),
        };
        let sent = serde_json::to_value(&request)
            .map_err(|err| TokenError::Transport(err.to_string()))
            .and_then(|payload| {
                self.transport
                    .send(&Destination::Master, &MessageName::new(PRODUCE_TOKEN), payload)
                    .map_err(|err| TokenError::Transport(err.to_string()))
            });
        if let Err(err) = sent {
            self.pending.forget(waiter.id());
            return Err(err);
        }
        let delivery = self.pending.wait(waiter, self.timeout).await.map_err(wait_error)?;
        match delivery.outcome {
            TokenOutcome::Issued {
                token,
            } if token.is_valid(self.clock.now_ms()) => Ok(token),
            TokenOutcome::Issued {
                ..
            } => Err(TokenError::refresh_failed(identity, "delivered token already expired")),
            TokenOutcome::Failed {
                reason,
            } => Err(TokenError::refresh_failed(identity, reason)),
        }
    }

    /// Installs a delivery and wakes its waiter; returns false for orphans.
    pub fn handle_delivery(&self, delivery: TokenDelivery) -> bool {
        if let TokenOutcome::Issued {
            token,
        } = &delivery.outcome
            && let Ok(mut cache) = self.cache.lock()
        {
            let newer = cache
                .get(&delivery.identity)
                .is_none_or(|current| current.expires_at_ms <= token.expires_at_ms);
            if newer {
                cache.insert(delivery.identity.clone(), token.clone());
            }
        }
        let correlation_id = delivery.correlation_id;
        let delivered = self.pending.complete(correlation_id, delivery);
        if !delivered {
            self.log.record(
                &RunLogEvent::warn(
                    "token_orphan_delivery",
                    format!("dropping token delivery {correlation_id} with no waiting request"),
                )
                .with_node(self.node().as_str()),
            );
        }
        delivered
    }

    /// Returns the locally cached token for `identity`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Poisoned`] when the cache lock is poisoned.
    pub fn cached(&self, identity: &Identity) -> Result<Option<AccessToken>, TokenError> {
        let cache = self.cache.lock().map_err(|_| TokenError::Poisoned)?;
        Ok(cache.get(identity).cloned())
    }

    /// Cancels every outstanding request.
    pub fn cancel_all(&self) -> usize {
        self.pending.cancel_all()
    }
}

/// Maps a wait failure onto the token taxonomy.
const fn wait_error(err: WaitError) -> TokenError {
    match err {
        WaitError::Timeout(_) => TokenError::Timeout,
        WaitError::Cancelled => TokenError::Cancelled,
    }
}

// ============================================================================
// SECTION: Handler
// ============================================================================

/// `consume_token` handler installed on workers.
pub struct ConsumeTokenHandler {
    /// Client receiving the deliveries.
    client: Arc<TokenClient>,
}

impl ConsumeTokenHandler {
    /// Creates the handler for a client.
    #[must_use]
    pub const fn new(client: Arc<TokenClient>) -> Self {
        Self {
            client,
        }
    }
}

#[async_trait]
impl MessageHandler for ConsumeTokenHandler {
    async fn handle(&self, message: Message) -> Result<(), HandlerError> {
        let delivery: TokenDelivery = serde_json::from_value(message.payload).map_err(|err| {
            HandlerError::MalformedPayload {
                name: message.name.to_string(),
                reason: err.to_string(),
            }
        })?;
        self.client.handle_delivery(delivery);
        Ok(())
    }
}
