// crates/swarmgate-auth/src/lib.rs
// ============================================================================
// Module: Swarmgate Auth Library
// Description: Token distribution between master and workers.
// Purpose: Share one upstream token per identity across every simulated user.
// Dependencies: swarmgate-core, async-trait, serde_json, tokio
// ============================================================================

//! ## Overview
//! The master runs a [`TokenDistributor`] in front of an upstream
//! [`TokenSource`] and answers `produce_token` messages through
//! [`ProduceTokenHandler`]. Workers ask through a [`TokenClient`], whose
//! [`ConsumeTokenHandler`] installs each delivered token into the worker-local
//! cache.
//! Invariants:
//! - One upstream refresh per identity at a time (single-flight).
//! - A token past its hard expiry is never served.
//! - Refresh failures reach every waiter of that refresh.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod client;
pub mod distributor;
pub mod messages;
pub mod source;
pub mod token;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use client::ConsumeTokenHandler;
pub use client::TokenClient;
pub use distributor::ProduceTokenHandler;
pub use distributor::TokenDistributor;
pub use messages::TokenDelivery;
pub use messages::TokenOutcome;
pub use messages::TokenRequest;
pub use source::TokenSource;
pub use source::TokenSourceError;
pub use token::AccessToken;
pub use token::DEFAULT_REFRESH_MARGIN_MS;
pub use token::DEFAULT_TOKEN_TTL_MS;
pub use token::IssuedToken;
pub use token::TokenError;
pub use token::TokenPolicy;
