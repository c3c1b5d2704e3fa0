// crates/swarmgate-auth/src/messages.rs
// ============================================================================
// Module: Token Messages
// Description: Payloads of the produce_token and consume_token messages.
// Purpose: Carry token requests and deliveries over the transport.
// Dependencies: serde, swarmgate-core
// ============================================================================

//! ## Overview
//! Workers send [`TokenRequest`] as `produce_token`; the master answers with
//! [`TokenDelivery`] as `consume_token`, echoing the correlation id.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use swarmgate_core::CorrelationId;
use swarmgate_core::Identity;

use crate::token::AccessToken;

// ============================================================================
// SECTION: Payloads
// ============================================================================

/// Worker request for an identity's token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRequest {
    /// Correlation id issued by the requesting client.
    pub correlation_id: CorrelationId,
    /// Identity whose token is requested.
    pub identity: Identity,
}

/// Master reply to a [`TokenRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenDelivery {
    /// Correlation id copied from the request.
    pub correlation_id: CorrelationId,
    /// Identity the token belongs to.
    pub identity: Identity,
    /// Delivery body.
    pub outcome: TokenOutcome,
}

/// Body of a [`TokenDelivery`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TokenOutcome {
    /// Token issued or served from cache.
    Issued {
        /// Token value and expiry.
        token: AccessToken,
    },
    /// The refresh failed.
    Failed {
        /// Failure description.
        reason: String,
    },
}
