// crates/swarmgate-auth/src/source.rs
// ============================================================================
// Module: Token Sources
// Description: Upstream identity providers consulted on refresh.
// Purpose: Decouple token issuance from caching and distribution.
// Dependencies: async-trait, swarmgate-core, thiserror
// ============================================================================

//! ## Overview
//! A [`TokenSource`] performs the actual upstream call. The distributor
//! guarantees at most one call per identity is in flight at a time.

// ============================================================================
// SECTION: Imports
// ============================================================================

use async_trait::async_trait;
use swarmgate_core::Identity;
use thiserror::Error;

use crate::token::IssuedToken;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Failure reported by an upstream token source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct TokenSourceError(pub String);

impl TokenSourceError {
    /// Creates a source error from a description.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Upstream token issuer.
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Obtains a new token for `identity`.
    ///
    /// # Errors
    ///
    /// Returns [`TokenSourceError`] when the upstream call fails.
    async fn refresh(&self, identity: &Identity) -> Result<IssuedToken, TokenSourceError>;
}
