// crates/swarmgate-auth/src/token.rs
// ============================================================================
// Module: Access Tokens
// Description: Token values, expiry rules, refresh policy, and errors.
// Purpose: Decide when a token may be served and when it must be refreshed.
// Dependencies: serde, swarmgate-core, thiserror
// ============================================================================

//! ## Overview
//! A token is *fresh* while more than the refresh margin remains before its
//! hard expiry, and *valid* until that expiry. Fresh tokens are served
//! without contacting the upstream source; valid-but-stale tokens may be
//! served while a refresh is in flight; expired tokens are never served.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use swarmgate_core::Identity;
use thiserror::Error;

// ============================================================================
// SECTION: Policy
// ============================================================================

/// Default margin before expiry that triggers a refresh.
pub const DEFAULT_REFRESH_MARGIN_MS: u64 = 30_000;
/// Default lifetime for tokens issued without an expiry.
pub const DEFAULT_TOKEN_TTL_MS: u64 = 300_000;

/// Expiry handling knobs shared by the distributor and worker clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenPolicy {
    /// Margin before expiry inside which a token is refreshed.
    pub refresh_margin_ms: u64,
    /// Lifetime applied to tokens issued without an expiry.
    pub default_ttl_ms: u64,
}

impl Default for TokenPolicy {
    fn default() -> Self {
        Self {
            refresh_margin_ms: DEFAULT_REFRESH_MARGIN_MS,
            default_ttl_ms: DEFAULT_TOKEN_TTL_MS,
        }
    }
}

// ============================================================================
// SECTION: Tokens
// ============================================================================

/// Token as cached and delivered to workers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    /// Opaque token value.
    pub value: String,
    /// Hard expiry in unix milliseconds.
    pub expires_at_ms: u64,
}

impl AccessToken {
    /// Creates a token with an absolute expiry.
    #[must_use]
    pub fn new(value: impl Into<String>, expires_at_ms: u64) -> Self {
        Self {
            value: value.into(),
            expires_at_ms,
        }
    }

    /// Returns true while the token is before its hard expiry.
    #[must_use]
    pub const fn is_valid(&self, now_ms: u64) -> bool {
        now_ms < self.expires_at_ms
    }

    /// Returns true while more than `margin_ms` remains before expiry.
    #[must_use]
    pub const fn is_fresh(&self, now_ms: u64, margin_ms: u64) -> bool {
        now_ms.saturating_add(margin_ms) < self.expires_at_ms
    }
}

/// Token as returned by an upstream source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    /// Opaque token value.
    pub value: String,
    /// Hard expiry in unix milliseconds, when the source reports one.
    pub expires_at_ms: Option<u64>,
}

impl IssuedToken {
    /// Creates an issued token.
    #[must_use]
    pub fn new(value: impl Into<String>, expires_at_ms: Option<u64>) -> Self {
        Self {
            value: value.into(),
            expires_at_ms,
        }
    }

    /// Converts into a cached token, applying `default_ttl_ms` when needed.
    #[must_use]
    pub fn into_access_token(self, now_ms: u64, default_ttl_ms: u64) -> AccessToken {
        let expires_at_ms =
            self.expires_at_ms.unwrap_or_else(|| now_ms.saturating_add(default_ttl_ms));
        AccessToken {
            value: self.value,
            expires_at_ms,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors surfaced to a caller asking for a token.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    /// The upstream refresh failed; every waiter sees the same failure.
    #[error("token refresh failed for {identity}: {reason}")]
    RefreshFailed {
        /// Identity the refresh was for.
        identity: String,
        /// Failure description.
        reason: String,
    },
    /// No delivery arrived within the configured bound.
    #[error("token request timed out")]
    Timeout,
    /// The run was aborted while the request was outstanding.
    #[error("token request cancelled")]
    Cancelled,
    /// The request could not be sent.
    #[error("token request failed: {0}")]
    Transport(String),
    /// A cache lock was poisoned by a panicking holder.
    #[error("token cache is poisoned")]
    Poisoned,
}

impl TokenError {
    /// Builds a refresh failure for an identity.
    #[must_use]
    pub fn refresh_failed(identity: &Identity, reason: impl Into<String>) -> Self {
        Self::RefreshFailed {
            identity: identity.to_string(),
            reason: reason.into(),
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
