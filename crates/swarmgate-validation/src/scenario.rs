// crates/swarmgate-validation/src/scenario.rs
// ============================================================================
// Module: Scenario Catalog
// Description: Registered scenarios, their thresholds, and their status.
// Purpose: Give the validator a stable view of what was meant to run.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! Scenarios are registered once per run with a unique name and identifier.
//! The identifier prefixes every request name the scenario records
//! (`"001 Register"`), which is how statistics are attributed back to it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::thresholds::ValidationThresholds;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while registering scenarios.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// Scenario name or identifier is empty.
    #[error("scenario name and identifier must be non-empty")]
    EmptyName,
    /// Scenario name is already registered.
    #[error("duplicate scenario name: {0}")]
    DuplicateName(String),
    /// Scenario identifier is already registered.
    #[error("duplicate scenario identifier: {0}")]
    DuplicateIdentifier(String),
}

// ============================================================================
// SECTION: Scenario
// ============================================================================

/// Outcome of a scenario after validation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioStatus {
    /// No failure recorded.
    #[default]
    Passed,
    /// Missing statistics or a breached threshold.
    Failed,
}

impl fmt::Display for ScenarioStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Passed => f.write_str("passed"),
            Self::Failed => f.write_str("failed"),
        }
    }
}

/// A registered scenario.
#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    /// Human-readable name used in log lines.
    pub name: String,
    /// Prefix of the scenario's request names.
    pub identifier: String,
    /// Limits checked after the run.
    pub thresholds: ValidationThresholds,
    /// Current status.
    pub status: ScenarioStatus,
}

impl Scenario {
    /// Creates a passed scenario.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        identifier: impl Into<String>,
        thresholds: ValidationThresholds,
    ) -> Self {
        Self {
            name: name.into(),
            identifier: identifier.into(),
            thresholds,
            status: ScenarioStatus::Passed,
        }
    }
}

// ============================================================================
// SECTION: Catalog
// ============================================================================

/// Scenarios registered for a run, in registration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScenarioCatalog {
    /// Registered scenarios.
    scenarios: Vec<Scenario>,
}

impl ScenarioCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a scenario.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] when the name or identifier is empty or
    /// already registered.
    pub fn register(&mut self, scenario: Scenario) -> Result<(), CatalogError> {
        if scenario.name.trim().is_empty() || scenario.identifier.trim().is_empty() {
            return Err(CatalogError::EmptyName);
        }
        if self.scenarios.iter().any(|existing| existing.name == scenario.name) {
            return Err(CatalogError::DuplicateName(scenario.name));
        }
        if self.scenarios.iter().any(|existing| existing.identifier == scenario.identifier) {
            return Err(CatalogError::DuplicateIdentifier(scenario.identifier));
        }
        self.scenarios.push(scenario);
        Ok(())
    }

    /// Returns the scenario named `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Scenario> {
        self.scenarios.iter().find(|scenario| scenario.name == name)
    }

    /// Returns true when a scenario uses `identifier`.
    #[must_use]
    pub fn has_identifier(&self, identifier: &str) -> bool {
        self.scenarios.iter().any(|scenario| scenario.identifier == identifier)
    }

    /// Iterates scenarios in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Scenario> {
        self.scenarios.iter()
    }

    /// Iterates scenarios for mutation.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Scenario> {
        self.scenarios.iter_mut()
    }

    /// Returns the number of scenarios.
    #[must_use]
    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    /// Returns true when nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }
}
