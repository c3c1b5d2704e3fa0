// crates/swarmgate-core/src/barrier.rs
// ============================================================================
// Module: Swarmgate Spawn Barrier
// Description: Two-state barrier gated on the spawning-complete signal.
// Purpose: Hold back test-data production until the user population exists.
// Dependencies: tokio
// ============================================================================

//! ## Overview
//! [`SpawnBarrier`] is LOCKED from construction (and from each role
//! initialization via [`SpawnBarrier::acquire`]) until the orchestrator reports
//! that spawning completed. Waiters suspend only their own task.
//! Invariants:
//! - LOCKED → UNLOCKED happens at most once per acquisition.
//! - A repeated release is a no-op and reports that nothing changed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;
use tokio::sync::watch;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Barrier state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BarrierState {
    /// Data production is held back.
    Locked,
    /// Spawning completed; data production may serve consumers.
    Unlocked,
}

/// Snapshot published through the watch channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct BarrierSnapshot {
    /// Current state.
    state: BarrierState,
    /// User count reported by the spawning-complete signal.
    spawned_users: Option<u64>,
}

/// One-shot barrier released when the user population has been spawned.
#[derive(Debug)]
pub struct SpawnBarrier {
    /// Watch channel carrying the current snapshot.
    state: watch::Sender<BarrierSnapshot>,
}

impl Default for SpawnBarrier {
    fn default() -> Self {
        Self::new()
    }
}

impl SpawnBarrier {
    /// Creates a barrier in the LOCKED state.
    #[must_use]
    pub fn new() -> Self {
        let (state, _) = watch::channel(BarrierSnapshot {
            state: BarrierState::Locked,
            spawned_users: None,
        });
        Self {
            state,
        }
    }

    /// Locks the barrier for a new role initialization.
    pub fn acquire(&self) {
        self.state.send_replace(BarrierState::Locked.into());
    }

    /// Unlocks the barrier with the final spawned user count.
    ///
    /// Returns `true` when this call performed the LOCKED → UNLOCKED
    /// transition and `false` when the barrier was already unlocked.
    pub fn release(&self, spawned_users: u64) -> bool {
        self.transition(Some(spawned_users))
    }

    /// Unlocks the barrier during teardown without a user count.
    ///
    /// Returns `true` when the barrier was still LOCKED.
    pub fn force_release(&self) -> bool {
        self.transition(None)
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> BarrierState {
        self.state.borrow().state
    }

    /// Returns true once the barrier has been released.
    #[must_use]
    pub fn is_unlocked(&self) -> bool {
        self.state() == BarrierState::Unlocked
    }

    /// Returns the user count reported by the release, when one was given.
    #[must_use]
    pub fn spawned_users(&self) -> Option<u64> {
        self.state.borrow().spawned_users
    }

    /// Suspends the calling task until the barrier is unlocked.
    pub async fn wait_unlocked(&self) {
        let mut receiver = self.state.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = receiver.wait_for(|snapshot| snapshot.state == BarrierState::Unlocked).await;
    }

    /// Applies the one-way transition.
    fn transition(&self, spawned_users: Option<u64>) -> bool {
        self.state.send_if_modified(|snapshot| {
            if snapshot.state == BarrierState::Unlocked {
                return false;
            }
            snapshot.state = BarrierState::Unlocked;
            snapshot.spawned_users = spawned_users;
            true
        })
    }
}

impl From<BarrierState> for BarrierSnapshot {
    fn from(state: BarrierState) -> Self {
        Self {
            state,
            spawned_users: None,
        }
    }
}
