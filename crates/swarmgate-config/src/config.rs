// crates/swarmgate-config/src/config.rs
// ============================================================================
// Module: Swarmgate Configuration
// Description: Configuration loading and validation for Swarmgate runs.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: swarmgate-core, swarmgate-testdata, swarmgate-auth, swarmgate-validation, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Every section has defaults, so an empty file is a valid (data-less) run.
//! Relative test-data file paths resolve against the config file directory.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use swarmgate_auth::DEFAULT_REFRESH_MARGIN_MS;
use swarmgate_auth::DEFAULT_TOKEN_TTL_MS;
use swarmgate_auth::TokenPolicy;
use swarmgate_core::FileRunLog;
use swarmgate_core::NoopRunLog;
use swarmgate_core::RunLog;
use swarmgate_core::StderrRunLog;
use swarmgate_testdata::DataSource;
use swarmgate_testdata::PoolOrder;
use swarmgate_testdata::PoolPlan;
use swarmgate_validation::Scenario;
use swarmgate_validation::ScenarioCatalog;
use swarmgate_validation::ValidationThresholds;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "swarmgate.toml";
/// Environment variable used to override the config path.
pub(crate) const CONFIG_ENV_VAR: &str = "SWARMGATE_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Default request timeout in milliseconds.
pub(crate) const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;
/// Minimum request timeout in milliseconds.
pub(crate) const MIN_REQUEST_TIMEOUT_MS: u64 = 100;
/// Maximum request timeout in milliseconds.
pub(crate) const MAX_REQUEST_TIMEOUT_MS: u64 = 600_000;
/// Maximum number of scenarios.
pub(crate) const MAX_SCENARIOS: usize = 1_024;
/// Maximum length of a scenario name or identifier.
pub(crate) const MAX_SCENARIO_NAME_LENGTH: usize = 256;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Swarmgate run configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SwarmgateConfig {
    /// Request timeouts.
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    /// Token refresh settings.
    #[serde(default)]
    pub tokens: TokenConfig,
    /// Test-data producer settings.
    #[serde(default)]
    pub testdata: TestdataConfig,
    /// Scenarios in registration order.
    #[serde(default)]
    pub scenarios: Vec<ScenarioConfig>,
    /// Run log sink.
    #[serde(default)]
    pub log: LogConfig,
    /// Directory of the loaded config file.
    #[serde(skip)]
    pub source_dir: Option<PathBuf>,
}

/// Request timeout settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimeoutConfig {
    /// Bound on each data or token wait.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

/// Token refresh settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TokenConfig {
    /// Margin before expiry that triggers a refresh.
    #[serde(default = "default_refresh_margin_ms")]
    pub refresh_margin_ms: u64,
    /// Lifetime for tokens issued without an expiry.
    #[serde(default = "default_token_ttl_ms")]
    pub default_ttl_ms: u64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            refresh_margin_ms: default_refresh_margin_ms(),
            default_ttl_ms: default_token_ttl_ms(),
        }
    }
}

/// Test-data producer settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TestdataConfig {
    /// Address of a remote producer; workers skip local construction when set.
    #[serde(default)]
    pub producer_address: Option<String>,
}

/// One scenario.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Scenario name used in log lines.
    pub name: String,
    /// Request-name prefix; defaults to the 1-based index as `001`.
    #[serde(default)]
    pub identifier: Option<String>,
    /// Test-data pool for the scenario.
    #[serde(default)]
    pub testdata: Option<ScenarioTestdataConfig>,
    /// Post-run thresholds.
    #[serde(default)]
    pub validation: ValidationThresholds,
}

/// Test-data pool of one scenario.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioTestdataConfig {
    /// Hand-out order.
    #[serde(default)]
    pub order: PoolOrder,
    /// Whether the pool wraps around instead of exhausting.
    #[serde(default)]
    pub cyclic: bool,
    /// Sources concatenated in declaration order.
    #[serde(default)]
    pub sources: Vec<DataSource>,
}

/// Run log sink selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogSinkKind {
    /// JSON lines on stderr.
    #[default]
    Stderr,
    /// JSON lines appended to `log.path`.
    File,
    /// Discard events.
    None,
}

/// Run log settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    /// Sink kind.
    #[serde(default)]
    pub sink: LogSinkKind,
    /// File path for [`LogSinkKind::File`].
    #[serde(default)]
    pub path: Option<PathBuf>,
}

// ============================================================================
// SECTION: Loading
// ============================================================================

impl SwarmgateConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let mut config = Self::from_toml(content)?;
        config.source_dir = resolved.parent().map(Path::to_path_buf);
        Ok(config)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.timeouts.validate()?;
        self.tokens.validate()?;
        self.testdata.validate()?;
        self.log.validate()?;
        if self.scenarios.len() > MAX_SCENARIOS {
            return Err(ConfigError::Invalid("too many scenarios".to_string()));
        }
        let mut names = BTreeSet::new();
        let mut identifiers = BTreeSet::new();
        for (index, scenario) in self.scenarios.iter().enumerate() {
            scenario.validate()?;
            if !names.insert(scenario.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate scenario name: {}",
                    scenario.name
                )));
            }
            let identifier = scenario.identifier(index);
            if !identifiers.insert(identifier.clone()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate scenario identifier: {identifier}"
                )));
            }
        }
        Ok(())
    }

    // ========================================================================
    // SECTION: Derived Views
    // ========================================================================

    /// Returns the request timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.timeouts.request_timeout_ms)
    }

    /// Returns the token refresh policy.
    #[must_use]
    pub const fn token_policy(&self) -> TokenPolicy {
        TokenPolicy {
            refresh_margin_ms: self.tokens.refresh_margin_ms,
            default_ttl_ms: self.tokens.default_ttl_ms,
        }
    }

    /// Returns the pool plans of scenarios with test data, keyed by name.
    #[must_use]
    pub fn pool_plans(&self) -> Vec<PoolPlan> {
        self.scenarios
            .iter()
            .filter_map(|scenario| {
                let testdata = scenario.testdata.as_ref()?;
                let sources =
                    testdata.sources.iter().map(|source| self.resolve_source(source)).collect();
                Some(
                    PoolPlan::new(scenario.name.as_str(), sources)
                        .with_order(testdata.order)
                        .with_cyclic(testdata.cyclic),
                )
            })
            .collect()
    }

    /// Returns the scenario catalog used for post-run validation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a scenario cannot be registered.
    pub fn catalog(&self) -> Result<ScenarioCatalog, ConfigError> {
        let mut catalog = ScenarioCatalog::new();
        for (index, scenario) in self.scenarios.iter().enumerate() {
            catalog
                .register(Scenario::new(
                    scenario.name.as_str(),
                    scenario.identifier(index),
                    scenario.validation.clone(),
                ))
                .map_err(|err| ConfigError::Invalid(err.to_string()))?;
        }
        Ok(catalog)
    }

    /// Builds the configured run log sink.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the log file cannot be opened.
    pub fn build_run_log(&self) -> Result<Arc<dyn RunLog>, ConfigError> {
        match (self.log.sink, &self.log.path) {
            (LogSinkKind::Stderr, _) => Ok(Arc::new(StderrRunLog)),
            (LogSinkKind::None, _) => Ok(Arc::new(NoopRunLog)),
            (LogSinkKind::File, Some(path)) => {
                let path = self.resolve_path(path);
                let log = FileRunLog::new(&path).map_err(|err| ConfigError::Io(err.to_string()))?;
                Ok(Arc::new(log))
            }
            (LogSinkKind::File, None) => {
                Err(ConfigError::Invalid("log.path is required for file sink".to_string()))
            }
        }
    }

    /// Resolves relative file sources against the config directory.
    fn resolve_source(&self, source: &DataSource) -> DataSource {
        match source {
            DataSource::Inline {
                ..
            } => source.clone(),
            DataSource::JsonFile {
                path,
            } => DataSource::JsonFile {
                path: self.resolve_path(path),
            },
            DataSource::JsonLinesFile {
                path,
            } => DataSource::JsonLinesFile {
                path: self.resolve_path(path),
            },
        }
    }

    /// Resolves a path against the config directory when relative.
    fn resolve_path(&self, path: &Path) -> PathBuf {
        match &self.source_dir {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path.to_path_buf(),
        }
    }
}

// ============================================================================
// SECTION: Section Validation
// ============================================================================

impl TimeoutConfig {
    /// Validates timeout bounds.
    fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_REQUEST_TIMEOUT_MS..=MAX_REQUEST_TIMEOUT_MS).contains(&self.request_timeout_ms) {
            return Err(ConfigError::Invalid(format!(
                "timeouts.request_timeout_ms must be between {MIN_REQUEST_TIMEOUT_MS} and \
                 {MAX_REQUEST_TIMEOUT_MS}"
            )));
        }
        Ok(())
    }
}

impl TokenConfig {
    /// Validates refresh settings.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.default_ttl_ms == 0 {
            return Err(ConfigError::Invalid("tokens.default_ttl_ms must be > 0".to_string()));
        }
        if self.refresh_margin_ms >= self.default_ttl_ms {
            return Err(ConfigError::Invalid(
                "tokens.refresh_margin_ms must be less than tokens.default_ttl_ms".to_string(),
            ));
        }
        Ok(())
    }
}

impl TestdataConfig {
    /// Validates the producer address.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(address) = &self.producer_address
            && address.trim().is_empty()
        {
            return Err(ConfigError::Invalid(
                "testdata.producer_address must be non-empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl LogConfig {
    /// Validates the sink selection.
    fn validate(&self) -> Result<(), ConfigError> {
        match (self.sink, &self.path) {
            (LogSinkKind::File, None) => {
                Err(ConfigError::Invalid("log.path is required for file sink".to_string()))
            }
            (LogSinkKind::File, Some(path)) => {
                validate_path_string("log.path", &path.to_string_lossy())
            }
            _ => Ok(()),
        }
    }
}

impl ScenarioConfig {
    /// Returns the identifier, defaulting to the zero-padded 1-based index.
    #[must_use]
    pub fn identifier(&self, index: usize) -> String {
        self.identifier.clone().unwrap_or_else(|| format!("{:03}", index + 1))
    }

    /// Validates names, sources, and thresholds.
    fn validate(&self) -> Result<(), ConfigError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ConfigError::Invalid("scenario name must be non-empty".to_string()));
        }
        if name.len() > MAX_SCENARIO_NAME_LENGTH {
            return Err(ConfigError::Invalid(format!("scenario {name}: name too long")));
        }
        if let Some(identifier) = &self.identifier {
            if identifier.is_empty() || identifier.contains(char::is_whitespace) {
                return Err(ConfigError::Invalid(format!(
                    "scenario {name}: identifier must be a single non-empty word"
                )));
            }
            if identifier.len() > MAX_SCENARIO_NAME_LENGTH {
                return Err(ConfigError::Invalid(format!("scenario {name}: identifier too long")));
            }
        }
        if let Some(testdata) = &self.testdata {
            for source in &testdata.sources {
                match source {
                    DataSource::Inline {
                        ..
                    } => {}
                    DataSource::JsonFile {
                        path,
                    }
                    | DataSource::JsonLinesFile {
                        path,
                    } => validate_path_string(
                        &format!("scenario {name}: testdata source path"),
                        &path.to_string_lossy(),
                    )?,
                }
            }
        }
        validate_thresholds(name, &self.validation)
    }
}

/// Validates threshold ranges for one scenario.
fn validate_thresholds(name: &str, thresholds: &ValidationThresholds) -> Result<(), ConfigError> {
    if let Some(ratio) = thresholds.fail_ratio
        && !(0.0..=1.0).contains(&ratio)
    {
        return Err(ConfigError::Invalid(format!(
            "scenario {name}: validation.fail_ratio must be between 0 and 1"
        )));
    }
    if let Some(avg) = thresholds.avg_response_time_ms
        && (!avg.is_finite() || avg < 0.0)
    {
        return Err(ConfigError::Invalid(format!(
            "scenario {name}: validation.avg_response_time_ms must be >= 0"
        )));
    }
    if let Some(limit) = thresholds.response_time_percentile
        && !(limit.percentile > 0.0 && limit.percentile <= 1.0)
    {
        return Err(ConfigError::Invalid(format!(
            "scenario {name}: validation.response_time_percentile.percentile must be in (0, 1]"
        )));
    }
    Ok(())
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns the default request timeout.
const fn default_request_timeout_ms() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_MS
}

/// Returns the default refresh margin.
const fn default_refresh_margin_ms() -> u64 {
    DEFAULT_REFRESH_MARGIN_MS
}

/// Returns the default token lifetime.
const fn default_token_ttl_ms() -> u64 {
    DEFAULT_TOKEN_TTL_MS
}

/// Resolves the config path from the argument or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    if path.to_string_lossy().len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        if component.as_os_str().to_string_lossy().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    validate_path(Path::new(trimmed))
        .map_err(|_| ConfigError::Invalid(format!("{field} exceeds path limits")))
}
