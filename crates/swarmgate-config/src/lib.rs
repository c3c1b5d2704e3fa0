// crates/swarmgate-config/src/lib.rs
// ============================================================================
// Module: Swarmgate Config Library
// Description: Configuration model and validation for Swarmgate runs.
// Purpose: Turn `swarmgate.toml` into pool plans, scenarios, and sinks.
// Dependencies: swarmgate-core, swarmgate-testdata, swarmgate-auth, swarmgate-validation, toml
// ============================================================================

//! ## Overview
//! [`SwarmgateConfig::load`] resolves the config path (argument, then the
//! `SWARMGATE_CONFIG` environment variable, then `swarmgate.toml`), parses it
//! fail-closed, and validates it. Derived views feed the other crates:
//! [`SwarmgateConfig::pool_plans`] for the producer,
//! [`SwarmgateConfig::catalog`] for the validator, and
//! [`SwarmgateConfig::build_run_log`] for logging.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod examples;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::ConfigError;
pub use config::LogConfig;
pub use config::LogSinkKind;
pub use config::ScenarioConfig;
pub use config::ScenarioTestdataConfig;
pub use config::SwarmgateConfig;
pub use config::TestdataConfig;
pub use config::TimeoutConfig;
pub use config::TokenConfig;
pub use examples::config_toml_example;
