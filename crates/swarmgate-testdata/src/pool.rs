// crates/swarmgate-testdata/src/pool.rs
// ============================================================================
// Module: Scenario Data Pools
// Description: Per-scenario record pools with their own exclusion scope.
// Purpose: Pop records atomically without a process-wide lock.
// Dependencies: swarmgate-core, rand, serde
// ============================================================================

//! ## Overview
//! A [`ScenarioDataPool`] is built once from a [`PoolPlan`] and then only
//! advanced. Each pool guards its cursor with its own mutex, held only for
//! the pop itself and never across an await point.
//! Invariants:
//! - Non-cyclic pools hand every record out at most once, in declared order
//!   (or the order fixed by the one-time shuffle for [`PoolOrder::Random`]).
//! - Cyclic pools wrap around; uniqueness holds within one cycle.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use rand::seq::SliceRandom;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use swarmgate_core::NodeId;
use swarmgate_core::ScenarioId;

use crate::producer::ProducerError;
use crate::source::DataSource;

// ============================================================================
// SECTION: Plan
// ============================================================================

/// Order in which records are handed out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolOrder {
    /// Declared order.
    #[default]
    Sequential,
    /// Shuffled once at construction.
    Random,
}

/// Declarative description of one scenario pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolPlan {
    /// Scenario the pool belongs to.
    pub scenario: ScenarioId,
    /// Hand-out order.
    pub order: PoolOrder,
    /// Whether the pool wraps around instead of exhausting.
    pub cyclic: bool,
    /// Sources concatenated in declaration order.
    pub sources: Vec<DataSource>,
}

impl PoolPlan {
    /// Creates a sequential, non-cyclic plan.
    #[must_use]
    pub fn new(scenario: impl Into<ScenarioId>, sources: Vec<DataSource>) -> Self {
        Self {
            scenario: scenario.into(),
            order: PoolOrder::Sequential,
            cyclic: false,
            sources,
        }
    }

    /// Creates a plan over inline records.
    #[must_use]
    pub fn inline(scenario: impl Into<ScenarioId>, records: Vec<Value>) -> Self {
        Self::new(scenario, vec![DataSource::Inline {
            records,
        }])
    }

    /// Sets the hand-out order.
    #[must_use]
    pub const fn with_order(mut self, order: PoolOrder) -> Self {
        self.order = order;
        self
    }

    /// Marks the pool as cyclic.
    #[must_use]
    pub const fn with_cyclic(mut self, cyclic: bool) -> Self {
        self.cyclic = cyclic;
        self
    }
}

// ============================================================================
// SECTION: Outcome
// ============================================================================

/// Result of asking a pool for its next record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataOutcome {
    /// Next record.
    Record(Value),
    /// No more records; the caller stops iterating.
    Exhausted,
}

impl DataOutcome {
    /// Returns the record, if any.
    #[must_use]
    pub fn into_record(self) -> Option<Value> {
        match self {
            Self::Record(record) => Some(record),
            Self::Exhausted => None,
        }
    }

    /// Returns true for the exhaustion signal.
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted)
    }
}

/// Hand-out accounting for one pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolSummary {
    /// Scenario the pool belongs to.
    pub scenario: ScenarioId,
    /// Records the pool was built with.
    pub total: usize,
    /// Records handed out so far.
    pub served: u64,
    /// Records still available; `None` for cyclic pools.
    pub remaining: Option<usize>,
    /// Records handed out per worker.
    pub per_worker: BTreeMap<NodeId, u64>,
}

// ============================================================================
// SECTION: Pool
// ============================================================================

/// Mutable cursor state of a pool.
#[derive(Debug)]
struct PoolState {
    /// Records in hand-out order.
    records: Vec<Value>,
    /// Index of the next record (monotonic for cyclic pools).
    cursor: usize,
    /// Records handed out per worker.
    per_worker: BTreeMap<NodeId, u64>,
    /// Records handed out in total.
    served: u64,
}

/// Records of one scenario, consumed without replacement unless cyclic.
#[derive(Debug)]
pub struct ScenarioDataPool {
    /// Scenario the pool belongs to.
    scenario: ScenarioId,
    /// Whether the pool wraps around.
    cyclic: bool,
    /// Records the pool was built with.
    total: usize,
    /// Cursor state behind the pool's own exclusion scope.
    state: Mutex<PoolState>,
    /// Set once the first exhaustion has been reported.
    exhaustion_reported: AtomicBool,
}

impl ScenarioDataPool {
    /// Builds a pool from a plan, loading every source.
    ///
    /// # Errors
    ///
    /// Returns [`ProducerError::Source`] when a source fails to load.
    pub fn from_plan(plan: &PoolPlan) -> Result<Self, ProducerError> {
        let mut records = Vec::new();
        for source in &plan.sources {
            records.extend(source.load()?);
        }
        if plan.order == PoolOrder::Random {
            records.shuffle(&mut rand::thread_rng());
        }
        Ok(Self::with_records(plan.scenario.clone(), records, plan.cyclic))
    }

    /// Builds a pool directly from records in hand-out order.
    #[must_use]
    pub fn with_records(scenario: ScenarioId, records: Vec<Value>, cyclic: bool) -> Self {
        Self {
            scenario,
            cyclic,
            total: records.len(),
            state: Mutex::new(PoolState {
                records,
                cursor: 0,
                per_worker: BTreeMap::new(),
                served: 0,
            }),
            exhaustion_reported: AtomicBool::new(false),
        }
    }

    /// Returns the scenario this pool serves.
    #[must_use]
    pub const fn scenario(&self) -> &ScenarioId {
        &self.scenario
    }

    /// Pops the next record for a worker.
    ///
    /// # Errors
    ///
    /// Returns [`ProducerError::Poisoned`] when the pool lock is poisoned.
    pub fn draw(&self, worker: &NodeId) -> Result<DataOutcome, ProducerError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| ProducerError::Poisoned(self.scenario.to_string()))?;
        let len = state.records.len();
        if len == 0 || (!self.cyclic && state.cursor >= len) {
            return Ok(DataOutcome::Exhausted);
        }
        let index = state.cursor % len;
        let record = if self.cyclic {
            state.records[index].clone()
        } else {
            std::mem::take(&mut state.records[index])
        };
        state.cursor += 1;
        state.served += 1;
        *state.per_worker.entry(worker.clone()).or_default() += 1;
        Ok(DataOutcome::Record(record))
    }

    /// Returns true exactly once, for the first caller to observe exhaustion.
    pub fn claim_exhaustion_report(&self) -> bool {
        !self.exhaustion_reported.swap(true, Ordering::AcqRel)
    }

    /// Returns hand-out accounting for the pool.
    #[must_use]
    pub fn summary(&self) -> PoolSummary {
        let (served, cursor, per_worker) = match self.state.lock() {
            Ok(state) => (state.served, state.cursor, state.per_worker.clone()),
            Err(_) => (0, 0, BTreeMap::new()),
        };
        PoolSummary {
            scenario: self.scenario.clone(),
            total: self.total,
            served,
            remaining: (!self.cyclic).then(|| self.total.saturating_sub(cursor)),
            per_worker,
        }
    }
}
