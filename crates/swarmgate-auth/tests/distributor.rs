// crates/swarmgate-auth/tests/distributor.rs
// ============================================================================
// Module: Token Distributor Tests
// Description: Tests for single-flight refresh and expiry handling.
// Purpose: Validate one upstream call per identity and expiry guarantees.
// Dependencies: swarmgate-auth, swarmgate-core, tokio
// ============================================================================
//! ## Overview
//! Exercises [`swarmgate_auth::TokenDistributor`] against a scripted source.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::Duration;

use async_trait::async_trait;
use swarmgate_auth::IssuedToken;
use swarmgate_auth::TokenDistributor;
use swarmgate_auth::TokenError;
use swarmgate_auth::TokenPolicy;
use swarmgate_auth::TokenSource;
use swarmgate_auth::TokenSourceError;
use swarmgate_core::Clock;
use swarmgate_core::Identity;
use swarmgate_core::ManualClock;
use swarmgate_core::MemoryRunLog;
use swarmgate_core::NoopRunLog;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Upstream source with a configurable delay, lifetime, and failure switch.
struct ScriptedSource {
    /// Calls observed.
    calls: AtomicU64,
    /// Simulated upstream latency.
    delay: Duration,
    /// Lifetime relative to the clock; `None` omits the expiry.
    ttl_ms: Option<u64>,
    /// Fails every call while set.
    failing: AtomicBool,
    /// Clock used to stamp expiries.
    clock: Arc<ManualClock>,
}

impl ScriptedSource {
    /// Creates a succeeding source.
    fn new(clock: Arc<ManualClock>, delay: Duration, ttl_ms: Option<u64>) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicU64::new(0),
            delay,
            ttl_ms,
            failing: AtomicBool::new(false),
            clock,
        })
    }
}

#[async_trait]
impl TokenSource for ScriptedSource {
    async fn refresh(&self, identity: &Identity) -> Result<IssuedToken, TokenSourceError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(self.delay).await;
        if self.failing.load(Ordering::SeqCst) {
            return Err(TokenSourceError::new("upstream unavailable"));
        }
        let expires_at_ms = self.ttl_ms.map(|ttl| self.clock.now_ms() + ttl);
        Ok(IssuedToken::new(format!("{identity}-{call}"), expires_at_ms))
    }
}

/// Builds a distributor with a 30 s margin.
fn distributor(source: Arc<ScriptedSource>, clock: Arc<ManualClock>) -> Arc<TokenDistributor> {
    let policy = TokenPolicy {
        refresh_margin_ms: 30_000,
        default_ttl_ms: 300_000,
    };
    Arc::new(TokenDistributor::new(source, clock, policy, Arc::new(NoopRunLog)))
}

// ============================================================================
// SECTION: Tests
// ============================================================================

/// Tests concurrent requests share one upstream refresh and one token.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_share_one_refresh() {
    let clock = Arc::new(ManualClock::new(0));
    let source = ScriptedSource::new(Arc::clone(&clock), Duration::from_millis(50), Some(60_000));
    let distributor = distributor(Arc::clone(&source), clock);
    let alice = Identity::new("alice");

    let tasks: Vec<_> = (0..32)
        .map(|_| {
            let distributor = Arc::clone(&distributor);
            let alice = alice.clone();
            tokio::spawn(async move { distributor.token(&alice).await })
        })
        .collect();
    let mut values = Vec::new();
    for task in tasks {
        values.push(task.await.unwrap().unwrap().value);
    }

    assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    assert_eq!(distributor.refresh_count(), 1);
    assert!(values.iter().all(|value| value == "alice-1"));
}

/// Tests identities refresh independently.
#[tokio::test]
async fn identities_refresh_independently() {
    let clock = Arc::new(ManualClock::new(0));
    let source = ScriptedSource::new(Arc::clone(&clock), Duration::ZERO, Some(60_000));
    let distributor = distributor(Arc::clone(&source), clock);
    let alice = distributor.token(&Identity::new("alice")).await.unwrap();
    let bob = distributor.token(&Identity::new("bob")).await.unwrap();
    assert_ne!(alice.value, bob.value);
    assert_eq!(distributor.refresh_count(), 2);
}

/// Tests a fresh cached token is served without contacting the source.
#[tokio::test]
async fn fresh_token_is_served_from_cache() {
    let clock = Arc::new(ManualClock::new(0));
    let source = ScriptedSource::new(Arc::clone(&clock), Duration::ZERO, Some(60_000));
    let distributor = distributor(Arc::clone(&source), Arc::clone(&clock));
    let alice = Identity::new("alice");
    let first = distributor.token(&alice).await.unwrap();
    clock.set(29_000);
    let second = distributor.token(&alice).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(source.calls.load(Ordering::SeqCst), 1);
}

/// Tests a token inside the margin is served while a refresh runs.
#[tokio::test]
async fn stale_valid_token_is_served_during_refresh() {
    let clock = Arc::new(ManualClock::new(0));
    let source = ScriptedSource::new(Arc::clone(&clock), Duration::from_millis(10), Some(60_000));
    let distributor = distributor(Arc::clone(&source), Arc::clone(&clock));
    let alice = Identity::new("alice");
    assert_eq!(distributor.token(&alice).await.unwrap().value, "alice-1");

    clock.set(40_000);
    let stale = distributor.token(&alice).await.unwrap();
    assert_eq!(stale.value, "alice-1");
    assert_eq!(distributor.refresh_count(), 2);

    tokio::time::sleep(Duration::from_millis(100)).await;
    let refreshed = distributor.token(&alice).await.unwrap();
    assert_eq!(refreshed.value, "alice-2");
    assert_eq!(refreshed.expires_at_ms, 100_000);
    assert_eq!(distributor.refresh_count(), 2);
}

/// Tests an expired token is never returned when the refresh fails.
#[tokio::test]
async fn expired_token_is_never_served() {
    let clock = Arc::new(ManualClock::new(0));
    let source = ScriptedSource::new(Arc::clone(&clock), Duration::ZERO, Some(60_000));
    let distributor = distributor(Arc::clone(&source), Arc::clone(&clock));
    let alice = Identity::new("alice");
    distributor.token(&alice).await.unwrap();

    source.failing.store(true, Ordering::SeqCst);
    clock.set(61_000);
    let err = distributor.token(&alice).await.unwrap_err();
    assert!(matches!(err, TokenError::RefreshFailed { identity, .. } if identity == "alice"));
}

/// Tests a refresh failure reaches every waiter and is logged.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn refresh_failure_reaches_every_waiter() {
    let clock = Arc::new(ManualClock::new(0));
    let source = ScriptedSource::new(Arc::clone(&clock), Duration::from_millis(50), Some(60_000));
    source.failing.store(true, Ordering::SeqCst);
    let log = Arc::new(MemoryRunLog::new());
    let distributor = Arc::new(TokenDistributor::new(
        source.clone(),
        clock,
        TokenPolicy::default(),
        log.clone(),
    ));

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let distributor = Arc::clone(&distributor);
            tokio::spawn(async move { distributor.token(&Identity::new("alice")).await })
        })
        .collect();
    for task in tasks {
        let err = task.await.unwrap().unwrap_err();
        assert_eq!(err, TokenError::RefreshFailed {
            identity: "alice".to_string(),
            reason: "upstream unavailable".to_string(),
        });
    }
    assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    assert_eq!(log.count_containing("upstream unavailable"), 1);

    source.failing.store(false, Ordering::SeqCst);
    assert_eq!(distributor.token(&Identity::new("alice")).await.unwrap().value, "alice-2");
}

/// Tests a token issued already expired is reported as a failed refresh.
#[tokio::test]
async fn token_issued_expired_is_rejected() {
    let clock = Arc::new(ManualClock::new(10_000));
    let source = ScriptedSource::new(Arc::clone(&clock), Duration::ZERO, Some(0));
    let distributor = distributor(source, clock);
    let err = distributor.token(&Identity::new("alice")).await.unwrap_err();
    assert!(matches!(err, TokenError::RefreshFailed { reason, .. } if reason.contains("expired")));
}

/// Tests tokens without an upstream expiry get the default lifetime.
#[tokio::test]
async fn missing_expiry_uses_default_ttl() {
    let clock = Arc::new(ManualClock::new(1_000));
    let source = ScriptedSource::new(Arc::clone(&clock), Duration::ZERO, None);
    let distributor = distributor(source, clock);
    let token = distributor.token(&Identity::new("alice")).await.unwrap();
    assert_eq!(token.expires_at_ms, 301_000);
}

/// Tests cancelling an in-flight refresh resolves its waiters.
#[tokio::test]
async fn cancel_all_resolves_waiters() {
    let clock = Arc::new(ManualClock::new(0));
    let source = ScriptedSource::new(Arc::clone(&clock), Duration::from_secs(30), Some(60_000));
    let distributor = distributor(source, clock);
    let waiter = {
        let distributor = Arc::clone(&distributor);
        tokio::spawn(async move { distributor.token(&Identity::new("alice")).await })
    };
    while distributor.refresh_count() == 0 {
        tokio::task::yield_now().await;
    }
    assert_eq!(distributor.cancel_all(), 1);
    assert_eq!(waiter.await.unwrap().unwrap_err(), TokenError::Cancelled);
}
