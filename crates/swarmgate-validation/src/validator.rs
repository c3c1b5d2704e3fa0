// crates/swarmgate-validation/src/validator.rs
// ============================================================================
// Module: Result Validator
// Description: Post-run comparison of statistics against scenario limits.
// Purpose: Set scenario status and the process exit code.
// Dependencies: swarmgate-core, serde
// ============================================================================

//! ## Overview
//! [`ResultValidator::validate`] runs once at the end of a run. Statistics
//! entries are attributed to scenarios by identifier prefix; entries that
//! belong to no scenario are reported and otherwise ignored.
//! Invariants:
//! - Validation never panics or returns an error; failures are recorded.
//! - The exit code only moves from 0 to 1 ([`RunExitCode`] is sticky).
//! - Each unmatched statistics entry is reported exactly once per call.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use serde::Serialize;
use swarmgate_core::RunLog;
use swarmgate_core::RunLogEvent;

use crate::scenario::ScenarioCatalog;
use crate::scenario::ScenarioStatus;
use crate::stats::StatsBook;

// ============================================================================
// SECTION: Exit Code
// ============================================================================

/// Process exit code that can only be raised.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunExitCode(i32);

impl RunExitCode {
    /// Successful run.
    pub const SUCCESS: Self = Self(0);
    /// Failed run.
    pub const FAILURE: Self = Self(1);

    /// Raises the code to failure.
    pub const fn fail(&mut self) {
        self.0 = Self::FAILURE.0;
    }

    /// Returns the numeric code.
    #[must_use]
    pub const fn code(self) -> i32 {
        self.0
    }

    /// Returns true while nothing has failed.
    #[must_use]
    pub const fn is_success(self) -> bool {
        self.0 == Self::SUCCESS.0
    }
}

// ============================================================================
// SECTION: Report
// ============================================================================

/// Validation outcome for one scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioVerdict {
    /// Scenario name.
    pub scenario: String,
    /// Status after validation.
    pub status: ScenarioStatus,
    /// Rendered reasons for failure.
    pub reasons: Vec<String>,
}

/// Outcome of one validation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    /// Per-scenario verdicts in registration order.
    pub verdicts: Vec<ScenarioVerdict>,
    /// Statistics entries that matched no scenario.
    pub unmatched: Vec<String>,
    /// Exit code after validation.
    pub exit_code: RunExitCode,
}

impl ValidationReport {
    /// Returns true when every scenario passed.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.verdicts.iter().all(|verdict| verdict.status == ScenarioStatus::Passed)
    }
}

// ============================================================================
// SECTION: Validator
// ============================================================================

/// Compares run statistics against registered scenarios.
pub struct ResultValidator {
    /// Run log for operator-visible failures.
    log: Arc<dyn RunLog>,
}

impl ResultValidator {
    /// Creates a validator logging to `log`.
    #[must_use]
    pub fn new(log: Arc<dyn RunLog>) -> Self {
        Self {
            log,
        }
    }

    /// Validates `book` against `catalog`, updating statuses and `exit_code`.
    pub fn validate(
        &self,
        catalog: &mut ScenarioCatalog,
        book: &StatsBook,
        exit_code: &mut RunExitCode,
    ) -> ValidationReport {
        let mut unmatched = Vec::new();
        for (name, _) in book.iter() {
            if !catalog.has_identifier(StatsBook::scenario_identifier(name)) {
                self.log.record(&RunLogEvent::error(
                    "validation_unmatched",
                    format!("{name} does not match any scenario"),
                ));
                unmatched.push(name.to_string());
            }
        }

        let mut verdicts = Vec::with_capacity(catalog.len());
        for scenario in catalog.iter_mut() {
            let mut reasons = Vec::new();
            match book.for_scenario(&scenario.identifier) {
                None => {
                    let reason = "no statistics found".to_string();
                    self.log.record(
                        &RunLogEvent::error(
                            "validation_missing_stats",
                            format!("{} failed due to {reason}", scenario.name),
                        )
                        .with_scenario(scenario.name.as_str()),
                    );
                    reasons.push(reason);
                }
                Some(stats) => {
                    for breach in scenario.thresholds.evaluate(&stats) {
                        let reason = breach.to_string();
                        self.log.record(
                            &RunLogEvent::error(
                                "validation_threshold_exceeded",
                                format!("{} failed due to {reason}", scenario.name),
                            )
                            .with_scenario(scenario.name.as_str()),
                        );
                        reasons.push(reason);
                    }
                }
            }
            if !reasons.is_empty() {
                scenario.status = ScenarioStatus::Failed;
                exit_code.fail();
            }
            verdicts.push(ScenarioVerdict {
                scenario: scenario.name.clone(),
                status: scenario.status,
                reasons,
            });
        }

        ValidationReport {
            verdicts,
            unmatched,
            exit_code: *exit_code,
        }
    }
}
