// crates/swarmgate-validation/src/lib.rs
// ============================================================================
// Module: Swarmgate Validation Library
// Description: Request statistics and post-run result validation.
// Purpose: Turn aggregated run statistics into scenario verdicts.
// Dependencies: swarmgate-core, serde, thiserror
// ============================================================================

//! ## Overview
//! Workers record request outcomes into a [`StatsBook`]; after the run the
//! [`ResultValidator`] compares each registered [`Scenario`] against its
//! [`ValidationThresholds`], marks failures, and raises the [`RunExitCode`].
//! Operator-facing lines keep a fixed wording:
//! `<scenario> failed due to <reason>` and `<name> does not match any scenario`.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod scenario;
pub mod stats;
pub mod thresholds;
pub mod validator;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use scenario::CatalogError;
pub use scenario::Scenario;
pub use scenario::ScenarioCatalog;
pub use scenario::ScenarioStatus;
pub use stats::RequestStats;
pub use stats::StatsBook;
pub use stats::bucket_response_time;
pub use thresholds::PercentileThreshold;
pub use thresholds::ThresholdBreach;
pub use thresholds::ValidationThresholds;
pub use validator::ResultValidator;
pub use validator::RunExitCode;
pub use validator::ScenarioVerdict;
pub use validator::ValidationReport;

#[cfg(test)]
mod tests;
