// crates/swarmgate-core/src/lib.rs
// ============================================================================
// Module: Swarmgate Core Library
// Description: Shared identifiers, message routing, and synchronization primitives.
// Purpose: Expose the building blocks used by every Swarmgate role.
// Dependencies: crate::{identifiers, message, registry, barrier, correlation, interfaces, log, time}
// ============================================================================

//! ## Overview
//! Swarmgate core holds the pieces shared by the master and worker roles of a
//! distributed load-test run: opaque identifiers, named messages and their
//! directions, the explicit [`HandlerTable`] built by [`MessageRegistry`], the
//! one-shot [`SpawnBarrier`], the [`PendingRequests`] correlation table, and
//! the structured [`RunLog`] sinks.
//! Invariants:
//! - Handler tables are only populated through [`MessageRegistry`] and are
//!   handed to the transport explicitly; there is no ambient handler state.
//! - The barrier transitions from locked to unlocked at most once per
//!   acquisition.
//! - Correlated waits always resolve: with a value, a timeout, or a
//!   cancellation.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod barrier;
pub mod correlation;
pub mod identifiers;
pub mod interfaces;
pub mod log;
pub mod message;
pub mod registry;
pub mod time;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use barrier::BarrierState;
pub use barrier::SpawnBarrier;
pub use correlation::PendingReceiver;
pub use correlation::PendingRequests;
pub use correlation::WaitError;
pub use identifiers::CorrelationId;
pub use identifiers::Identity;
pub use identifiers::MessageName;
pub use identifiers::NodeId;
pub use identifiers::ScenarioId;
pub use interfaces::HandlerError;
pub use interfaces::MessageHandler;
pub use interfaces::Transport;
pub use interfaces::TransportError;
pub use interfaces::handler_fn;
pub use log::FileRunLog;
pub use log::LogLevel;
pub use log::MemoryRunLog;
pub use log::NoopRunLog;
pub use log::RunLog;
pub use log::RunLogEvent;
pub use log::StderrRunLog;
pub use message::CONSUME_TESTDATA;
pub use message::CONSUME_TOKEN;
pub use message::Destination;
pub use message::Direction;
pub use message::Message;
pub use message::PRODUCE_TOKEN;
pub use registry::HandlerEntry;
pub use registry::HandlerTable;
pub use registry::MessageRegistry;
pub use time::Clock;
pub use time::ManualClock;
pub use time::SystemClock;
