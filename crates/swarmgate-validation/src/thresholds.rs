// crates/swarmgate-validation/src/thresholds.rs
// ============================================================================
// Module: Validation Thresholds
// Description: Per-scenario limits and the breaches they report.
// Purpose: Compare aggregated statistics against configured limits.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Each configured limit is evaluated independently; a scenario can breach
//! several at once. A breach renders as the `<reason>` in
//! `<scenario> failed due to <reason>`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::stats::RequestStats;

// ============================================================================
// SECTION: Thresholds
// ============================================================================

/// Percentile limit: the `percentile` response time must not exceed `threshold_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PercentileThreshold {
    /// Percentile in (0, 1], for example `0.99`.
    pub percentile: f64,
    /// Upper bound in milliseconds.
    pub threshold_ms: u64,
}

/// Optional limits for one scenario.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ValidationThresholds {
    /// Upper bound on failures over requests.
    #[serde(default)]
    pub fail_ratio: Option<f64>,
    /// Upper bound on the mean response time in milliseconds.
    #[serde(default)]
    pub avg_response_time_ms: Option<f64>,
    /// Upper bound on a response-time percentile.
    #[serde(default)]
    pub response_time_percentile: Option<PercentileThreshold>,
}

impl ValidationThresholds {
    /// Returns true when no limit is configured.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.fail_ratio.is_none()
            && self.avg_response_time_ms.is_none()
            && self.response_time_percentile.is_none()
    }

    /// Evaluates every configured limit against `stats`.
    #[must_use]
    pub fn evaluate(&self, stats: &RequestStats) -> Vec<ThresholdBreach> {
        let mut breaches = Vec::new();
        if let Some(limit) = self.fail_ratio {
            let observed = stats.fail_ratio();
            if observed > limit {
                breaches.push(ThresholdBreach::FailRatio {
                    observed,
                    limit,
                });
            }
        }
        if let Some(limit_ms) = self.avg_response_time_ms {
            let observed_ms = stats.avg_response_time();
            if observed_ms > limit_ms {
                breaches.push(ThresholdBreach::AvgResponseTime {
                    observed_ms,
                    limit_ms,
                });
            }
        }
        if let Some(limit) = self.response_time_percentile {
            let observed_ms = stats.percentile(limit.percentile);
            if observed_ms > limit.threshold_ms {
                breaches.push(ThresholdBreach::ResponseTimePercentile {
                    percentile: limit.percentile,
                    observed_ms,
                    limit_ms: limit.threshold_ms,
                });
            }
        }
        breaches
    }
}

// ============================================================================
// SECTION: Breaches
// ============================================================================

/// A limit exceeded by a scenario.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ThresholdBreach {
    /// Failures over requests exceeded the limit.
    FailRatio {
        /// Observed ratio.
        observed: f64,
        /// Configured limit.
        limit: f64,
    },
    /// Mean response time exceeded the limit.
    AvgResponseTime {
        /// Observed mean in milliseconds.
        observed_ms: f64,
        /// Configured limit in milliseconds.
        limit_ms: f64,
    },
    /// A response-time percentile exceeded the limit.
    ResponseTimePercentile {
        /// Percentile evaluated.
        percentile: f64,
        /// Observed response time in milliseconds.
        observed_ms: u64,
        /// Configured limit in milliseconds.
        limit_ms: u64,
    },
}

impl fmt::Display for ThresholdBreach {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FailRatio {
                observed,
                limit,
            } => write!(f, "fail ratio {}% > {}%", trim(observed * 100.0), trim(limit * 100.0)),
            Self::AvgResponseTime {
                observed_ms,
                limit_ms,
            } => write!(
                f,
                "average response time {} ms > {} ms",
                trim(*observed_ms),
                trim(*limit_ms)
            ),
            Self::ResponseTimePercentile {
                percentile,
                observed_ms,
                limit_ms,
            } => write!(
                f,
                "p{} response time {observed_ms} ms > {limit_ms} ms",
                trim(percentile * 100.0)
            ),
        }
    }
}

/// Formats with at most two decimals and no trailing zeros.
fn trim(value: f64) -> String {
    let formatted = format!("{value:.2}");
    formatted.trim_end_matches('0').trim_end_matches('.').to_string()
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test fixtures use explicit asserts and unwraps for clarity."
    )]

    use super::PercentileThreshold;
    use super::ThresholdBreach;
    use super::ValidationThresholds;
    use crate::stats::RequestStats;

    #[test]
    fn breaches_render_operator_reasons() {
        let fail = ThresholdBreach::FailRatio {
            observed: 0.2,
            limit: 0.1,
        };
        assert_eq!(fail.to_string(), "fail ratio 20% > 10%");
        let avg = ThresholdBreach::AvgResponseTime {
            observed_ms: 33.456,
            limit_ms: 2.0,
        };
        assert_eq!(avg.to_string(), "average response time 33.46 ms > 2 ms");
        let percentile = ThresholdBreach::ResponseTimePercentile {
            percentile: 0.99,
            observed_ms: 56,
            limit_ms: 2,
        };
        assert_eq!(percentile.to_string(), "p99 response time 56 ms > 2 ms");
    }

    #[test]
    fn limits_are_evaluated_independently() {
        let mut stats = RequestStats::new();
        for response_time in [10, 20, 30, 40] {
            stats.log_request(response_time);
        }
        stats.log_failure();
        let thresholds = ValidationThresholds {
            fail_ratio: Some(0.5),
            avg_response_time_ms: Some(20.0),
            response_time_percentile: Some(PercentileThreshold {
                percentile: 0.5,
                threshold_ms: 10,
            }),
        };
        let breaches = thresholds.evaluate(&stats);
        assert_eq!(breaches.len(), 2);
        assert!(matches!(breaches[0], ThresholdBreach::AvgResponseTime { .. }));
        assert!(matches!(breaches[1], ThresholdBreach::ResponseTimePercentile { .. }));
        assert!(ValidationThresholds::default().evaluate(&stats).is_empty());
    }
}
