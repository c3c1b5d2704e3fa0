// crates/swarmgate-testdata/src/lib.rs
// ============================================================================
// Module: Swarmgate Test Data Library
// Description: Master-side data pools and worker-side data consumers.
// Purpose: Hand finite test-data records to concurrently requesting workers.
// Dependencies: swarmgate-core, rand, serde_json, tokio
// ============================================================================

//! ## Overview
//! The master owns one [`ScenarioDataPool`] per scenario inside the
//! [`TestdataProducer`]; the [`ProducerService`] serves requests once the
//! spawn barrier opens and replies with `consume_testdata` messages. Workers
//! ask through a [`TestdataConsumer`], which correlates replies back to the
//! waiting task.
//! Invariants:
//! - A record is handed to at most one requester (per cycle for cyclic pools).
//! - Exclusion is per pool; unrelated scenarios never contend.
//! - Exhaustion is an outcome ([`DataOutcome::Exhausted`]), not an error.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod consumer;
pub mod messages;
pub mod pool;
pub mod producer;
pub mod service;
pub mod source;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use consumer::ConsumeTestdataHandler;
pub use consumer::ConsumerError;
pub use consumer::ProducerConnector;
pub use consumer::ProducerLink;
pub use consumer::TestdataConsumer;
pub use messages::DataReply;
pub use messages::DataRequest;
pub use messages::DataResponse;
pub use pool::DataOutcome;
pub use pool::PoolOrder;
pub use pool::PoolPlan;
pub use pool::PoolSummary;
pub use pool::ScenarioDataPool;
pub use producer::ProducerError;
pub use producer::TestdataProducer;
pub use service::ProducerHandle;
pub use service::ProducerService;
pub use source::DataSource;
