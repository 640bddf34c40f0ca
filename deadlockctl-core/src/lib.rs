//! deadlockctl-core: gated concurrent dispatch of identical transactions
//!
//! Fires a fixed number of workers at the same rows at the same moment so the
//! database has to detect and break the resulting lock cycles.

pub mod config;
pub mod engine;
pub mod error;
pub mod executor;
pub mod pool;
pub mod schema;
pub mod simulate;

pub use config::{SimulatorConfig, DEFAULT_CONCURRENCY};
pub use engine::Engine;
pub use error::{DeadlockError, Result};
pub use executor::{
    execute_fragments, split_fragments, FragmentOutcome, MySqlExecutor, PostgresExecutor,
    StatementSink, TransactionExecutor,
};
pub use schema::DEADLOCKING_STATEMENT;
/// Driver error type carried by [`DeadlockError::Database`]
pub use sqlx::Error as SqlxError;
pub use simulate::{dispatch, simulate, DispatchSummary, Gate, GateWatch};
