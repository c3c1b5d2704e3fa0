// crates/swarmgate-auth/src/distributor.rs
// ============================================================================
// Module: Token Distributor
// Description: Master-side token cache with single-flight refresh.
// Purpose: Issue tokens to workers with at most one upstream call per identity.
// Dependencies: swarmgate-core, async-trait, serde_json, tokio
// ============================================================================

//! ## Overview
//! Each identity owns a slot holding its cached token and, while a refresh is
//! running, a watch receiver on the refresh result. The refresh itself runs on
//! a spawned task so a cancelled caller never abandons the other waiters.
//! Invariants:
//! - At most one upstream refresh per identity is in flight.
//! - Every waiter of a refresh observes the same result.
//! - A token past its hard expiry is never returned.
//! - The map lock and a slot lock are never held together.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use async_trait::async_trait;
use swarmgate_core::CONSUME_TOKEN;
use swarmgate_core::Clock;
use swarmgate_core::Destination;
use swarmgate_core::HandlerError;
use swarmgate_core::Identity;
use swarmgate_core::Message;
use swarmgate_core::MessageHandler;
use swarmgate_core::MessageName;
use swarmgate_core::RunLog;
use swarmgate_core::RunLogEvent;
use swarmgate_core::Transport;
use swarmgate_core::TransportError;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::messages::TokenDelivery;
use crate::messages::TokenOutcome;
use crate::messages::TokenRequest;
use crate::source::TokenSource;
use crate::token::AccessToken;
use crate::token::TokenError;
use crate::token::TokenPolicy;

// ============================================================================
// SECTION: Slots
// ============================================================================

/// Value published when a refresh settles; `None` until then.
type RefreshResult = Option<Result<AccessToken, TokenError>>;

/// Per-identity cache and in-flight refresh.
#[derive(Default)]
struct SlotState {
    /// Last successfully issued token.
    cached: Option<AccessToken>,
    /// Receiver on the running refresh, if any.
    inflight: Option<watch::Receiver<RefreshResult>>,
    /// Task running the refresh, if any.
    task: Option<JoinHandle<()>>,
}

/// Shared handle to a slot.
type Slot = Arc<Mutex<SlotState>>;

// ============================================================================
// SECTION: Distributor
// ============================================================================

/// Master-side token cache.
pub struct TokenDistributor {
    /// Upstream issuer.
    source: Arc<dyn TokenSource>,
    /// Time source for expiry decisions.
    clock: Arc<dyn Clock>,
    /// Refresh margin and default lifetime.
    policy: TokenPolicy,
    /// Slots keyed by identity.
    slots: Mutex<HashMap<Identity, Slot>>,
    /// Upstream refreshes started.
    refreshes: Arc<AtomicU64>,
    /// Run log for refresh failures.
    log: Arc<dyn RunLog>,
}

impl TokenDistributor {
    /// Creates a distributor over an upstream source.
    #[must_use]
    pub fn new(
        source: Arc<dyn TokenSource>,
        clock: Arc<dyn Clock>,
        policy: TokenPolicy,
        log: Arc<dyn RunLog>,
    ) -> Self {
        Self {
            source,
            clock,
            policy,
            slots: Mutex::new(HashMap::new()),
            refreshes: Arc::new(AtomicU64::new(0)),
            log,
        }
    }

    /// Returns the number of upstream refreshes started so far.
    #[must_use]
    pub fn refresh_count(&self) -> u64 {
        self.refreshes.load(Ordering::Acquire)
    }

    /// Returns a token for `identity`, refreshing at most once concurrently.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::RefreshFailed`] when the shared refresh fails,
    /// [`TokenError::Cancelled`] when it is aborted, and
    /// [`TokenError::Poisoned`] when a cache lock is poisoned.
    pub async fn token(&self, identity: &Identity) -> Result<AccessToken, TokenError> {
        let slot = self.slot(identity)?;
        let mut receiver = {
            let mut state = slot.lock().map_err(|_| TokenError::Poisoned)?;
            let now = self.clock.now_ms();
            if let Some(token) = &state.cached
                && token.is_fresh(now, self.policy.refresh_margin_ms)
            {
                return Ok(token.clone());
            }
            let receiver = match state.inflight.clone() {
                Some(receiver) => receiver,
                None => self.start_refresh(identity, &slot, &mut state),
            };
            if let Some(token) = &state.cached
                && token.is_valid(now)
            {
                return Ok(token.clone());
            }
            receiver
        };
        match receiver.wait_for(Option::is_some).await {
            Ok(settled) => settled.clone().unwrap_or(Err(TokenError::Cancelled)),
            Err(_) => Err(TokenError::Cancelled),
        }
    }

    /// Aborts every in-flight refresh; waiters resolve as cancelled.
    pub fn cancel_all(&self) -> usize {
        let slots: Vec<Slot> = match self.slots.lock() {
            Ok(slots) => slots.values().cloned().collect(),
            Err(_) => return 0,
        };
        let mut cancelled = 0;
        for slot in slots {
            if let Ok(mut state) = slot.lock() {
                state.inflight = None;
                if let Some(task) = state.task.take() {
                    task.abort();
                    cancelled += 1;
                }
            }
        }
        cancelled
    }

    /// Returns the slot for `identity`, creating it on first use.
    fn slot(&self, identity: &Identity) -> Result<Slot, TokenError> {
        let mut slots = self.slots.lock().map_err(|_| TokenError::Poisoned)?;
        Ok(Arc::clone(slots.entry(identity.clone()).or_default()))
    }

    /// Spawns the refresh task and records it in the slot.
    fn start_refresh(
        &self,
        identity: &Identity,
        slot: &Slot,
        state: &mut SlotState,
    ) -> watch::Receiver<RefreshResult> {
        let (sender, receiver) = watch::channel(None);
        self.refreshes.fetch_add(1, Ordering::AcqRel);
        let source = Arc::clone(&self.source);
        let clock = Arc::clone(&self.clock);
        let log = Arc::clone(&self.log);
        let default_ttl_ms = self.policy.default_ttl_ms;
        let identity = identity.clone();
        let slot = Arc::clone(slot);
        let task = tokio::spawn(async move {
            let result = match source.refresh(&identity).await {
                Ok(issued) => {
                    let now = clock.now_ms();
                    let token = issued.into_access_token(now, default_ttl_ms);
                    if token.is_valid(now) {
                        Ok(token)
                    } else {
                        Err(TokenError::refresh_failed(&identity, "token issued already expired"))
                    }
                }
                Err(err) => Err(TokenError::refresh_failed(&identity, err.to_string())),
            };
            if let Ok(mut state) = slot.lock() {
                if let Ok(token) = &result {
                    state.cached = Some(token.clone());
                }
                state.inflight = None;
                state.task = None;
            }
            if let Err(err) = &result {
                log.record(&RunLogEvent::error("token_refresh_failed", err.to_string()));
            }
            let _ = sender.send(Some(result));
        });
        state.inflight = Some(receiver.clone());
        state.task = Some(task);
        receiver
    }
}

// ============================================================================
// SECTION: Handler
// ============================================================================

/// `produce_token` handler installed on the master.
pub struct ProduceTokenHandler {
    /// Distributor answering the requests.
    distributor: Arc<TokenDistributor>,
    /// Route back to the requesting worker.
    transport: Arc<dyn Transport>,
}

impl ProduceTokenHandler {
    /// Creates the handler.
    #[must_use]
    pub fn new(distributor: Arc<TokenDistributor>, transport: Arc<dyn Transport>) -> Self {
        Self {
            distributor,
            transport,
        }
    }
}

#[async_trait]
impl MessageHandler for ProduceTokenHandler {
    async fn handle(&self, message: Message) -> Result<(), HandlerError> {
        let request: TokenRequest = serde_json::from_value(message.payload).map_err(|err| {
            HandlerError::MalformedPayload {
                name: message.name.to_string(),
                reason: err.to_string(),
            }
        })?;
        let outcome = match self.distributor.token(&request.identity).await {
            Ok(token) => TokenOutcome::Issued {
                token,
            },
            Err(err) => TokenOutcome::Failed {
                reason: err.to_string(),
            },
        };
        let delivery = TokenDelivery {
            correlation_id: request.correlation_id,
            identity: request.identity,
            outcome,
        };
        let payload = serde_json::to_value(&delivery)
            .map_err(|err| TransportError::SendFailed(err.to_string()))?;
        self.transport.send(
            &Destination::Worker(message.sender),
            &MessageName::new(CONSUME_TOKEN),
            payload,
        )?;
        Ok(())
    }
}
