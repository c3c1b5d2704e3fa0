// crates/swarmgate-runtime/src/role.rs
// ============================================================================
// Module: Roles
// Description: Role variants and their default handler sets.
// Purpose: Decide which messages a process receives and who handles them.
// Dependencies: swarmgate-core
// ============================================================================

//! ## Overview
//! A master receives worker-to-master messages, a worker receives
//! master-to-worker messages, and a local (single-process) run receives both.
//! [`default_handlers`] is pure: it only selects among the handlers the
//! caller built, so the effective table is always
//! `build(default_handlers(..), overrides)`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use swarmgate_core::CONSUME_TESTDATA;
use swarmgate_core::CONSUME_TOKEN;
use swarmgate_core::Direction;
use swarmgate_core::HandlerTable;
use swarmgate_core::MessageHandler;
use swarmgate_core::PRODUCE_TOKEN;

// ============================================================================
// SECTION: Role
// ============================================================================

/// Part a process plays in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Owns pools and the token cache.
    Master,
    /// Runs simulated users.
    Worker,
    /// Master and worker in one process.
    Local,
}

impl Role {
    /// Returns the directions whose messages this role receives.
    #[must_use]
    pub const fn receiving_directions(self) -> &'static [Direction] {
        match self {
            Self::Master => &[Direction::WorkerToMaster],
            Self::Worker => &[Direction::MasterToWorker],
            Self::Local => &[Direction::WorkerToMaster, Direction::MasterToWorker],
        }
    }

    /// Returns true when the role owns pools and the token cache.
    #[must_use]
    pub const fn is_master_side(self) -> bool {
        matches!(self, Self::Master | Self::Local)
    }

    /// Returns true when the role runs simulated users.
    #[must_use]
    pub const fn is_worker_side(self) -> bool {
        matches!(self, Self::Worker | Self::Local)
    }

    /// Returns the lowercase role name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Master => "master",
            Self::Worker => "worker",
            Self::Local => "local",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Default Handlers
// ============================================================================

/// Built-in handlers available to a role.
#[derive(Clone, Default)]
pub struct BuiltinHandlers {
    /// Worker-side `consume_testdata` handler.
    pub consume_testdata: Option<Arc<dyn MessageHandler>>,
    /// Master-side `produce_token` handler.
    pub produce_token: Option<Arc<dyn MessageHandler>>,
    /// Worker-side `consume_token` handler.
    pub consume_token: Option<Arc<dyn MessageHandler>>,
}

/// Returns the default handler table of a role; every entry requires an ack.
#[must_use]
pub fn default_handlers(role: Role, builtins: &BuiltinHandlers) -> HandlerTable {
    let mut table = HandlerTable::new();
    if role.is_master_side()
        && let Some(handler) = &builtins.produce_token
    {
        table.insert(PRODUCE_TOKEN, Arc::clone(handler), true);
    }
    if role.is_worker_side() {
        if let Some(handler) = &builtins.consume_testdata {
            table.insert(CONSUME_TESTDATA, Arc::clone(handler), true);
        }
        if let Some(handler) = &builtins.consume_token {
            table.insert(CONSUME_TOKEN, Arc::clone(handler), true);
        }
    }
    table
}

// ============================================================================
// SECTION: Tests
// ============================================================================
