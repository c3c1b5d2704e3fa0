// crates/swarmgate-core/src/correlation.rs
// ============================================================================
// Module: Swarmgate Request Correlation
// Description: Pending-request table keyed by correlation identifier.
// Purpose: Route asynchronous responses back to the task that asked for them.
// Dependencies: tokio, thiserror
// ============================================================================

//! ## Overview
//! A worker-side client registers a waiter, sends its request, and awaits the
//! [`PendingReceiver`]. The response handler completes the waiter by
//! correlation id, so responses may arrive in any order.
//! Invariants:
//! - Every waiter resolves exactly once: value, [`WaitError::Timeout`], or
//!   [`WaitError::Cancelled`].
//! - Timed-out waiters are removed so late responses are dropped, not leaked.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::oneshot;

use crate::identifiers::CorrelationId;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Reasons a correlated wait ended without a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WaitError {
    /// No response arrived within the configured bound.
    #[error("timed out after {0:?} waiting for a response")]
    Timeout(Duration),
    /// The run was aborted or the table was torn down.
    #[error("request cancelled")]
    Cancelled,
}

// ============================================================================
// SECTION: Pending Requests
// ============================================================================

/// Receiver half handed to the waiting task.
#[derive(Debug)]
pub struct PendingReceiver<T> {
    /// Correlation id the receiver waits on.
    id: CorrelationId,
    /// Oneshot completed by the response handler.
    receiver: oneshot::Receiver<T>,
}

impl<T> PendingReceiver<T> {
    /// Returns the correlation id of the request.
    #[must_use]
    pub const fn id(&self) -> CorrelationId {
        self.id
    }
}

/// Correlation id → waiting task table.
#[derive(Debug)]
pub struct PendingRequests<T> {
    /// Next correlation id to hand out.
    next_id: AtomicU64,
    /// Outstanding waiters.
    waiters: Mutex<HashMap<CorrelationId, oneshot::Sender<T>>>,
}

impl<T> Default for PendingRequests<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> PendingRequests<T> {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            waiters: Mutex::new(HashMap::new()),
        }
    }

    /// Registers a waiter under a fresh correlation id.
    ///
    /// # Errors
    ///
    /// Returns [`WaitError::Cancelled`] when the table lock is poisoned.
    pub fn register(&self) -> Result<PendingReceiver<T>, WaitError> {
        let id = CorrelationId::from_raw(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (sender, receiver) = oneshot::channel();
        self.waiters.lock().map_err(|_| WaitError::Cancelled)?.insert(id, sender);
        Ok(PendingReceiver {
            id,
            receiver,
        })
    }

    /// Completes the waiter for `id`; returns false when no waiter exists.
    pub fn complete(&self, id: CorrelationId, value: T) -> bool {
        let sender = match self.waiters.lock() {
            Ok(mut waiters) => waiters.remove(&id),
            Err(_) => None,
        };
        sender.is_some_and(|sender| sender.send(value).is_ok())
    }

    /// Drops the waiter for `id` without completing it.
    pub fn forget(&self, id: CorrelationId) {
        if let Ok(mut waiters) = self.waiters.lock() {
            waiters.remove(&id);
        }
    }

    /// Cancels every outstanding waiter, returning how many were pending.
    pub fn cancel_all(&self) -> usize {
        match self.waiters.lock() {
            Ok(mut waiters) => {
                let count = waiters.len();
                // Dropping the senders wakes each receiver with a closed error.
                waiters.clear();
                count
            }
            Err(_) => 0,
        }
    }

    /// Returns the number of outstanding waiters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.waiters.lock().map(|waiters| waiters.len()).unwrap_or_default()
    }

    /// Returns true when nothing is outstanding.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Awaits the response for a registered waiter within `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`WaitError::Timeout`] when the bound elapses and
    /// [`WaitError::Cancelled`] when the waiter was cancelled.
    pub async fn wait(&self, pending: PendingReceiver<T>, timeout: Duration) -> Result<T, WaitError> {
        let PendingReceiver {
            id,
            receiver,
        } = pending;
        match tokio::time::timeout(timeout, receiver).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(_)) => Err(WaitError::Cancelled),
            Err(_) => {
                self.forget(id);
                Err(WaitError::Timeout(timeout))
            }
        }
    }
}
