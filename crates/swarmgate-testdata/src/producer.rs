// crates/swarmgate-testdata/src/producer.rs
// ============================================================================
// Module: Test Data Producer
// Description: Master-side owner of every scenario pool.
// Purpose: Serve next-record requests with per-scenario exclusion.
// Dependencies: swarmgate-core, thiserror
// ============================================================================

//! ## Overview
//! [`TestdataProducer`] maps scenario ids to pools. The map itself is fixed
//! at construction, so lookups take no lock; only the addressed pool's own
//! mutex is held while a record is popped.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::Arc;

use swarmgate_core::NodeId;
use swarmgate_core::RunLog;
use swarmgate_core::RunLogEvent;
use swarmgate_core::ScenarioId;
use thiserror::Error;

use crate::pool::DataOutcome;
use crate::pool::PoolPlan;
use crate::pool::PoolSummary;
use crate::pool::ScenarioDataPool;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while building or serving pools.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProducerError {
    /// A data source failed to load.
    #[error("test data source failed: {0}")]
    Source(String),
    /// Two plans name the same scenario.
    #[error("duplicate test data pool for scenario {0}")]
    DuplicateScenario(String),
    /// No pool exists for the requested scenario.
    #[error("no test data pool for scenario {0}")]
    UnknownScenario(String),
    /// A pool lock was poisoned by a panicking holder.
    #[error("test data pool for scenario {0} is poisoned")]
    Poisoned(String),
}

// ============================================================================
// SECTION: Producer
// ============================================================================

/// Master-side owner of all scenario pools.
pub struct TestdataProducer {
    /// Pools keyed by scenario; immutable after construction.
    pools: HashMap<ScenarioId, ScenarioDataPool>,
    /// Run log for exhaustion notices.
    log: Arc<dyn RunLog>,
}

impl TestdataProducer {
    /// Builds every pool from its plan.
    ///
    /// # Errors
    ///
    /// Returns [`ProducerError`] when a source fails to load or two plans
    /// share a scenario.
    pub fn new(plans: &[PoolPlan], log: Arc<dyn RunLog>) -> Result<Self, ProducerError> {
        let mut pools = HashMap::with_capacity(plans.len());
        for plan in plans {
            if pools.contains_key(&plan.scenario) {
                return Err(ProducerError::DuplicateScenario(plan.scenario.to_string()));
            }
            pools.insert(plan.scenario.clone(), ScenarioDataPool::from_plan(plan)?);
        }
        Ok(Self {
            pools,
            log,
        })
    }

    /// Pops the next record of a scenario pool for a worker.
    ///
    /// # Errors
    ///
    /// Returns [`ProducerError::UnknownScenario`] when no pool exists and
    /// [`ProducerError::Poisoned`] when the pool lock is poisoned.
    pub fn request(
        &self,
        scenario: &ScenarioId,
        worker: &NodeId,
    ) -> Result<DataOutcome, ProducerError> {
        let pool = self
            .pools
            .get(scenario)
            .ok_or_else(|| ProducerError::UnknownScenario(scenario.to_string()))?;
        let outcome = pool.draw(worker)?;
        if outcome.is_exhausted() && pool.claim_exhaustion_report() {
            self.log.record(
                &RunLogEvent::info("testdata_exhausted", format!("{scenario} has no more test data"))
                    .with_scenario(scenario.as_str())
                    .with_node(worker.as_str()),
            );
        }
        Ok(outcome)
    }

    /// Returns the scenarios with a pool, in sorted order.
    #[must_use]
    pub fn scenarios(&self) -> Vec<ScenarioId> {
        let mut scenarios: Vec<ScenarioId> = self.pools.keys().cloned().collect();
        scenarios.sort();
        scenarios
    }

    /// Returns hand-out accounting for every pool, sorted by scenario.
    #[must_use]
    pub fn summary(&self) -> Vec<PoolSummary> {
        let mut summaries: Vec<PoolSummary> =
            self.pools.values().map(ScenarioDataPool::summary).collect();
        summaries.sort_by(|left, right| left.scenario.cmp(&right.scenario));
        summaries
    }
}
