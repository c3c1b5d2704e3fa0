// crates/swarmgate-runtime/src/runtime.rs
// ============================================================================
// Module: Role Runtime
// Description: Role initialization, barrier signalling, validation, teardown.
// Purpose: Wire pools, token caches, and handler tables for one process.
// Dependencies: swarmgate-auth, swarmgate-config, swarmgate-core, swarmgate-testdata, swarmgate-validation
// ============================================================================

//! ## Overview
//! [`RoleRuntime::builder`] collects the transport, configuration, and
//! optional collaborators of a process; [`RoleRuntimeBuilder::initialize`]
//! locks the spawn barrier, builds the role's components, merges the default
//! handler set with the registry's overrides, and attaches the effective
//! table to the transport. Initialization must run inside a tokio runtime
//! because the master-side producer endpoint is a spawned task.
//! Invariants:
//! - The barrier is LOCKED when initialization returns.
//! - A missing producer is logged and the run continues degraded.
//! - The exit code only moves from success to failure.
//! - Teardown always leaves the barrier UNLOCKED.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;

use swarmgate_auth::ConsumeTokenHandler;
use swarmgate_auth::ProduceTokenHandler;
use swarmgate_auth::TokenClient;
use swarmgate_auth::TokenDistributor;
use swarmgate_auth::TokenSource;
use swarmgate_config::ConfigError;
use swarmgate_config::SwarmgateConfig;
use swarmgate_core::Clock;
use swarmgate_core::HandlerTable;
use swarmgate_core::MessageHandler;
use swarmgate_core::MessageRegistry;
use swarmgate_core::NodeId;
use swarmgate_core::RunLog;
use swarmgate_core::RunLogEvent;
use swarmgate_core::SpawnBarrier;
use swarmgate_core::StderrRunLog;
use swarmgate_core::SystemClock;
use swarmgate_core::Transport;
use swarmgate_core::TransportError;
use swarmgate_testdata::ConsumeTestdataHandler;
use swarmgate_testdata::PoolSummary;
use swarmgate_testdata::ProducerConnector;
use swarmgate_testdata::ProducerError;
use swarmgate_testdata::ProducerHandle;
use swarmgate_testdata::ProducerLink;
use swarmgate_testdata::ProducerService;
use swarmgate_testdata::TestdataConsumer;
use swarmgate_testdata::TestdataProducer;
use swarmgate_validation::ResultValidator;
use swarmgate_validation::RunExitCode;
use swarmgate_validation::ScenarioCatalog;
use swarmgate_validation::StatsBook;
use swarmgate_validation::ValidationReport;
use thiserror::Error;

use crate::role::BuiltinHandlers;
use crate::role::Role;
use crate::role::default_handlers;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Producer address used by workers when none is configured.
pub const DEFAULT_PRODUCER_ADDRESS: &str = "master";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while initializing or operating a role.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum RoleError {
    /// The transport rejected the handler table.
    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),
    /// Test-data pools could not be built.
    #[error("test data producer failure: {0}")]
    Producer(#[from] ProducerError),
    /// The configuration could not be turned into components.
    #[error("configuration failure: {0}")]
    Config(#[from] ConfigError),
    /// Runtime state lock poisoned.
    #[error("role runtime state poisoned")]
    Poisoned,
}

// ============================================================================
// SECTION: Builder
// ============================================================================

/// Builder for a [`RoleRuntime`].
pub struct RoleRuntimeBuilder {
    /// Role of this process.
    role: Role,
    /// Transport the effective table is attached to.
    transport: Arc<dyn Transport>,
    /// Run configuration.
    config: SwarmgateConfig,
    /// Upstream token issuer for master-side distributors.
    token_source: Option<Arc<dyn TokenSource>>,
    /// Resolver for remote producer addresses.
    connector: Option<Arc<dyn ProducerConnector>>,
    /// Time source for token expiry.
    clock: Arc<dyn Clock>,
    /// Run log sink.
    log: Arc<dyn RunLog>,
}

impl RoleRuntimeBuilder {
    /// Sets the run configuration.
    #[must_use]
    pub fn config(mut self, config: &SwarmgateConfig) -> Self {
        self.config = config.clone();
        self
    }

    /// Sets the upstream token source; the master side distributes tokens only
    /// when one is configured.
    #[must_use]
    pub fn token_source(mut self, source: Arc<dyn TokenSource>) -> Self {
        self.token_source = Some(source);
        self
    }

    /// Sets the connector used to reach a remote producer.
    #[must_use]
    pub fn connector(mut self, connector: Arc<dyn ProducerConnector>) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Overrides the time source.
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Overrides the run log sink.
    #[must_use]
    pub fn log(mut self, log: Arc<dyn RunLog>) -> Self {
        self.log = log;
        self
    }

    /// Initializes the role and attaches its effective handler table.
    ///
    /// # Errors
    ///
    /// Returns [`RoleError::Producer`] when pool sources cannot be loaded,
    /// [`RoleError::Config`] when the scenario catalog cannot be built, and
    /// [`RoleError::Transport`] when the transport rejects the table.
    pub fn initialize(self, registry: &MessageRegistry) -> Result<RoleRuntime, RoleError> {
        let role = self.role;
        let node = self.transport.node_id().clone();
        let barrier = Arc::new(SpawnBarrier::new());
        barrier.acquire();

        let catalog = self.config.catalog()?;
        let timeout = self.config.request_timeout();
        let policy = self.config.token_policy();
        let producer_address = self.config.testdata.producer_address.clone();
        let mut builtins = BuiltinHandlers::default();

        let mut producer = None;
        let mut distributor = None;
        if role.is_master_side() {
            let remote = role.is_worker_side() && producer_address.is_some();
            let plans = self.config.pool_plans();
            if !remote && !plans.is_empty() {
                let pools = Arc::new(TestdataProducer::new(&plans, Arc::clone(&self.log))?);
                producer = Some(Arc::new(ProducerService::spawn(
                    pools,
                    Arc::clone(&barrier),
                    Arc::clone(&self.transport),
                    Arc::clone(&self.log),
                )));
            }
            if !remote && producer.is_none() {
                self.log.record(
                    &RunLogEvent::error("testdata_missing", "there is no test data")
                        .with_node(node.as_str()),
                );
            }
            if let Some(source) = &self.token_source {
                let tokens = Arc::new(TokenDistributor::new(
                    Arc::clone(source),
                    Arc::clone(&self.clock),
                    policy,
                    Arc::clone(&self.log),
                ));
                let handler: Arc<dyn MessageHandler> = Arc::new(ProduceTokenHandler::new(
                    Arc::clone(&tokens),
                    Arc::clone(&self.transport),
                ));
                builtins.produce_token = Some(handler);
                distributor = Some(tokens);
            }
        }

        let mut consumer = None;
        let mut token_client = None;
        if role.is_worker_side() {
            let link = self.producer_link(&node, producer.as_ref(), producer_address.as_deref());
            let data = Arc::new(TestdataConsumer::new(
                node.clone(),
                link,
                timeout,
                Arc::clone(&self.log),
            ));
            let client = Arc::new(TokenClient::new(
                Arc::clone(&self.transport),
                Arc::clone(&self.clock),
                policy,
                timeout,
                Arc::clone(&self.log),
            ));
            let data_handler: Arc<dyn MessageHandler> =
                Arc::new(ConsumeTestdataHandler::new(Arc::clone(&data)));
            let token_handler: Arc<dyn MessageHandler> =
                Arc::new(ConsumeTokenHandler::new(Arc::clone(&client)));
            builtins.consume_testdata = Some(data_handler);
            builtins.consume_token = Some(token_handler);
            consumer = Some(data);
            token_client = Some(client);
        }

        let defaults = default_handlers(role, &builtins);
        let overrides = registry.overrides_for(role.receiving_directions());
        let effective = MessageRegistry::build(&defaults, &overrides);
        self.transport.attach(effective.clone())?;
        self.log.record(
            &RunLogEvent::info(
                "role_initialized",
                format!("{role} role initialized with {} handlers", effective.len()),
            )
            .with_node(node.as_str()),
        );

        Ok(RoleRuntime {
            role,
            node,
            transport: self.transport,
            barrier,
            effective,
            producer,
            consumer,
            token_client,
            distributor,
            catalog: Mutex::new(catalog),
            exit_code: Mutex::new(RunExitCode::SUCCESS),
            log: self.log,
        })
    }

    /// Resolves the producer link of the worker side, logging when none exists.
    ///
    /// A local role without pools was already reported by the master side.
    fn producer_link(
        &self,
        node: &NodeId,
        local: Option<&Arc<ProducerHandle>>,
        address: Option<&str>,
    ) -> Option<Arc<dyn ProducerLink>> {
        let link = match (self.role, local) {
            (Role::Local, Some(handle)) => Some(Arc::clone(handle) as Arc<dyn ProducerLink>),
            (Role::Local, None) if address.is_none() => return None,
            _ => {
                let address = address.unwrap_or(DEFAULT_PRODUCER_ADDRESS);
                match self.connector.as_ref().map(|connector| connector.connect(address)) {
                    Some(Ok(link)) => Some(link),
                    Some(Err(err)) => {
                        self.log.record(
                            &RunLogEvent::warn(
                                "testdata_connect_failed",
                                format!("failed to reach test data producer at {address}: {err}"),
                            )
                            .with_node(node.as_str()),
                        );
                        None
                    }
                    None => None,
                }
            }
        };
        if link.is_none() {
            self.log.record(
                &RunLogEvent::error("testdata_missing", "there is no test data")
                    .with_node(node.as_str()),
            );
        }
        link
    }
}

// ============================================================================
// SECTION: Runtime
// ============================================================================

/// Accounting returned by [`RoleRuntime::teardown`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeardownSummary {
    /// Outstanding waits and refreshes that were cancelled.
    pub cancelled: usize,
    /// Hand-out accounting of every pool owned by this process.
    pub pools: Vec<PoolSummary>,
    /// True when the barrier was still LOCKED and had to be forced open.
    pub barrier_forced: bool,
}

/// Initialized role of one process.
pub struct RoleRuntime {
    /// Role of this process.
    role: Role,
    /// Node this process runs as.
    node: NodeId,
    /// Transport holding the effective table.
    transport: Arc<dyn Transport>,
    /// Barrier gating test-data replies.
    barrier: Arc<SpawnBarrier>,
    /// Table attached at initialization.
    effective: HandlerTable,
    /// Producer endpoint, on the master side when pools exist.
    producer: Option<Arc<ProducerHandle>>,
    /// Test-data client, on the worker side.
    consumer: Option<Arc<TestdataConsumer>>,
    /// Token client, on the worker side.
    token_client: Option<Arc<TokenClient>>,
    /// Token cache, on the master side when a source is configured.
    distributor: Option<Arc<TokenDistributor>>,
    /// Scenarios validated after the run.
    catalog: Mutex<ScenarioCatalog>,
    /// Sticky process exit code.
    exit_code: Mutex<RunExitCode>,
    /// Run log sink.
    log: Arc<dyn RunLog>,
}

impl RoleRuntime {
    /// Returns a builder for `role` over `transport`.
    #[must_use]
    pub fn builder(role: Role, transport: Arc<dyn Transport>) -> RoleRuntimeBuilder {
        RoleRuntimeBuilder {
            role,
            transport,
            config: SwarmgateConfig::default(),
            token_source: None,
            connector: None,
            clock: Arc::new(SystemClock),
            log: Arc::new(StderrRunLog),
        }
    }

    /// Returns the role of this process.
    #[must_use]
    pub const fn role(&self) -> Role {
        self.role
    }

    /// Returns the node this process runs as.
    #[must_use]
    pub const fn node(&self) -> &NodeId {
        &self.node
    }

    /// Returns the spawn barrier.
    #[must_use]
    pub fn barrier(&self) -> Arc<SpawnBarrier> {
        Arc::clone(&self.barrier)
    }

    /// Returns the table attached at initialization.
    #[must_use]
    pub const fn effective_table(&self) -> &HandlerTable {
        &self.effective
    }

    /// Returns the producer endpoint, when this process owns pools.
    #[must_use]
    pub fn producer(&self) -> Option<Arc<ProducerHandle>> {
        self.producer.clone()
    }

    /// Returns the test-data client, on the worker side.
    #[must_use]
    pub fn consumer(&self) -> Option<Arc<TestdataConsumer>> {
        self.consumer.clone()
    }

    /// Returns the token client, on the worker side.
    #[must_use]
    pub fn token_client(&self) -> Option<Arc<TokenClient>> {
        self.token_client.clone()
    }

    /// Returns the token distributor, on the master side.
    #[must_use]
    pub fn distributor(&self) -> Option<Arc<TokenDistributor>> {
        self.distributor.clone()
    }

    /// Signals that all users are spawned; returns true on the first call.
    pub fn spawning_complete(&self, spawned_users: u64) -> bool {
        let released = self.barrier.release(spawned_users);
        if released {
            self.log.record(
                &RunLogEvent::info(
                    "barrier_released",
                    format!("spawning complete with {spawned_users} users"),
                )
                .with_node(self.node.as_str()),
            );
        }
        released
    }

    /// Validates run statistics against the configured scenarios.
    ///
    /// # Errors
    ///
    /// Returns [`RoleError::Poisoned`] when runtime state is poisoned.
    pub fn validate_results(&self, book: &StatsBook) -> Result<ValidationReport, RoleError> {
        let mut catalog = self.catalog.lock().map_err(|_| RoleError::Poisoned)?;
        let mut exit_code = self.exit_code.lock().map_err(|_| RoleError::Poisoned)?;
        let validator = ResultValidator::new(Arc::clone(&self.log));
        Ok(validator.validate(&mut catalog, book, &mut exit_code))
    }

    /// Returns the process exit code so far.
    ///
    /// # Errors
    ///
    /// Returns [`RoleError::Poisoned`] when runtime state is poisoned.
    pub fn exit_code(&self) -> Result<RunExitCode, RoleError> {
        self.exit_code.lock().map(|code| *code).map_err(|_| RoleError::Poisoned)
    }

    /// Cancels outstanding work, reports pools, and opens the barrier.
    pub fn teardown(&self) -> TeardownSummary {
        let mut cancelled = 0;
        if let Some(consumer) = &self.consumer {
            cancelled += consumer.cancel_all();
        }
        if let Some(client) = &self.token_client {
            cancelled += client.cancel_all();
        }
        if let Some(distributor) = &self.distributor {
            cancelled += distributor.cancel_all();
        }

        let pools = self.producer.as_ref().map(|producer| {
            producer.shutdown();
            producer.summary()
        });
        let pools = pools.unwrap_or_default();
        for pool in &pools {
            let remaining =
                pool.remaining.map_or_else(|| "cyclic".to_string(), |left| left.to_string());
            self.log.record(
                &RunLogEvent::info(
                    "testdata_summary",
                    format!(
                        "{} served {} of {} records ({remaining} remaining) to {} workers",
                        pool.scenario,
                        pool.served,
                        pool.total,
                        pool.per_worker.len()
                    ),
                )
                .with_scenario(pool.scenario.as_str())
                .with_node(self.node.as_str()),
            );
        }

        let barrier_forced = self.barrier.force_release();
        if let Err(err) = self.transport.attach(HandlerTable::new()) {
            self.log.record(
                &RunLogEvent::warn("handler_detach_failed", format!("failed to detach handlers: {err}"))
                    .with_node(self.node.as_str()),
            );
        }
        self.log.record(
            &RunLogEvent::info(
                "role_teardown",
                format!("{} role torn down, {cancelled} waits cancelled", self.role),
            )
            .with_node(self.node.as_str()),
        );
        TeardownSummary {
            cancelled,
            pools,
            barrier_forced,
        }
    }
}
