// crates/swarmgate-validation/src/stats.rs
// ============================================================================
// Module: Request Statistics
// Description: Aggregated request counters and response-time distributions.
// Purpose: Feed per-scenario figures into threshold evaluation.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! [`RequestStats`] keeps counters plus a bucketed response-time histogram.
//! Response times are rounded before bucketing (exact below 100 ms, to 10 ms
//! below 1 s, to 100 ms below 10 s, to 1 s above) so the histogram stays
//! small over long runs. [`StatsBook`] holds one entry per request name;
//! request names are prefixed by the identifier of their scenario
//! (`"001 Register"`).

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Rounding
// ============================================================================

/// Rounds a response time to its histogram bucket.
#[must_use]
pub const fn bucket_response_time(response_time_ms: u64) -> u64 {
    let step = match response_time_ms {
        0..100 => return response_time_ms,
        100..1_000 => 10,
        1_000..10_000 => 100,
        _ => 1_000,
    };
    response_time_ms.saturating_add(step / 2) / step * step
}

// ============================================================================
// SECTION: Request Stats
// ============================================================================

/// Aggregated statistics for one request name (or a merge of several).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestStats {
    /// Requests recorded, failed ones included.
    pub num_requests: u64,
    /// Requests that failed.
    pub num_failures: u64,
    /// Sum of unrounded response times.
    pub total_response_time_ms: u64,
    /// Fastest response, when any.
    pub min_response_time_ms: Option<u64>,
    /// Slowest response.
    pub max_response_time_ms: u64,
    /// Histogram of rounded response times.
    pub response_times: BTreeMap<u64, u64>,
}

impl RequestStats {
    /// Creates empty statistics.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one request.
    pub fn log_request(&mut self, response_time_ms: u64) {
        self.num_requests += 1;
        self.total_response_time_ms = self.total_response_time_ms.saturating_add(response_time_ms);
        self.min_response_time_ms =
            Some(self.min_response_time_ms.map_or(response_time_ms, |min| min.min(response_time_ms)));
        self.max_response_time_ms = self.max_response_time_ms.max(response_time_ms);
        *self.response_times.entry(bucket_response_time(response_time_ms)).or_default() += 1;
    }

    /// Marks one recorded request as failed.
    pub fn log_failure(&mut self) {
        self.num_failures += 1;
    }

    /// Returns true when nothing has been recorded.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.num_requests == 0 && self.num_failures == 0
    }

    /// Returns the mean response time, or zero without requests.
    #[must_use]
    #[allow(clippy::cast_precision_loss, reason = "Millisecond totals fit f64 precision.")]
    pub fn avg_response_time(&self) -> f64 {
        if self.num_requests == 0 {
            return 0.0;
        }
        self.total_response_time_ms as f64 / self.num_requests as f64
    }

    /// Returns failures over requests; failures without requests count as 1.
    #[must_use]
    #[allow(clippy::cast_precision_loss, reason = "Request counts fit f64 precision.")]
    pub fn fail_ratio(&self) -> f64 {
        if self.num_requests == 0 {
            return if self.num_failures > 0 { 1.0 } else { 0.0 };
        }
        self.num_failures as f64 / self.num_requests as f64
    }

    /// Returns the response time below which `percent` of requests fall.
    ///
    /// Walks the histogram from the slowest bucket down and stops at the
    /// first bucket where the requests left are within the percentile.
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "Percent is clamped to [0, 1] before truncating the request count."
    )]
    pub fn percentile(&self, percent: f64) -> u64 {
        let total: u64 = self.response_times.values().sum();
        let within = (total as f64 * percent.clamp(0.0, 1.0)) as u64;
        let mut processed = 0_u64;
        for (response_time, count) in self.response_times.iter().rev() {
            processed += count;
            if total - processed <= within {
                return *response_time;
            }
        }
        0
    }

    /// Folds another entry into this one.
    pub fn merge(&mut self, other: &Self) {
        self.num_requests += other.num_requests;
        self.num_failures += other.num_failures;
        self.total_response_time_ms =
            self.total_response_time_ms.saturating_add(other.total_response_time_ms);
        self.min_response_time_ms = match (self.min_response_time_ms, other.min_response_time_ms) {
            (Some(left), Some(right)) => Some(left.min(right)),
            (left, right) => left.or(right),
        };
        self.max_response_time_ms = self.max_response_time_ms.max(other.max_response_time_ms);
        for (response_time, count) in &other.response_times {
            *self.response_times.entry(*response_time).or_default() += count;
        }
    }
}

// ============================================================================
// SECTION: Stats Book
// ============================================================================

/// Statistics for every request name seen in a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatsBook {
    /// Entries keyed by request name.
    entries: BTreeMap<String, RequestStats>,
}

impl StatsBook {
    /// Creates an empty book.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the entry for `name`, creating it on first use.
    pub fn entry(&mut self, name: &str) -> &mut RequestStats {
        self.entries.entry(name.to_string()).or_default()
    }

    /// Records a request under `name`.
    pub fn log_request(&mut self, name: &str, response_time_ms: u64) {
        self.entry(name).log_request(response_time_ms);
    }

    /// Records a failure under `name`.
    pub fn log_failure(&mut self, name: &str) {
        self.entry(name).log_failure();
    }

    /// Returns the entry for `name`, if present.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&RequestStats> {
        self.entries.get(name)
    }

    /// Iterates entries in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RequestStats)> {
        self.entries.iter().map(|(name, stats)| (name.as_str(), stats))
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when the book has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the scenario identifier an entry name belongs to.
    #[must_use]
    pub fn scenario_identifier(name: &str) -> &str {
        name.split_whitespace().next().unwrap_or_default()
    }

    /// Merges every entry of the scenario with `identifier`.
    #[must_use]
    pub fn for_scenario(&self, identifier: &str) -> Option<RequestStats> {
        let mut merged: Option<RequestStats> = None;
        for (name, stats) in self.iter() {
            if Self::scenario_identifier(name) == identifier {
                merged.get_or_insert_with(RequestStats::new).merge(stats);
            }
        }
        merged
    }

    /// Groups entries by scenario identifier.
    #[must_use]
    pub fn by_scenario(&self) -> BTreeMap<String, RequestStats> {
        let mut grouped: BTreeMap<String, RequestStats> = BTreeMap::new();
        for (name, stats) in self.iter() {
            grouped.entry(Self::scenario_identifier(name).to_string()).or_default().merge(stats);
        }
        grouped
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
