// crates/swarmgate-runtime/src/lib.rs
// ============================================================================
// Module: Swarmgate Runtime Library
// Description: Role wiring for master, worker, and local processes.
// Purpose: Turn configuration and a transport into a running role.
// Dependencies: crate::{hub, role, runtime}
// ============================================================================

//! ## Overview
//! A process picks a [`Role`], hands its transport and configuration to
//! [`RoleRuntime::builder`], and initializes against the externally
//! populated [`swarmgate_core::MessageRegistry`]. The [`InProcessHub`]
//! connects a master and workers inside one process for local runs and
//! tests.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod hub;
pub mod role;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use hub::HubTransport;
pub use hub::InProcessHub;
pub use role::BuiltinHandlers;
pub use role::Role;
pub use role::default_handlers;
pub use runtime::DEFAULT_PRODUCER_ADDRESS;
pub use runtime::RoleError;
pub use runtime::RoleRuntime;
pub use runtime::RoleRuntimeBuilder;
pub use runtime::TeardownSummary;

#[cfg(test)]
mod tests;
