//! Wiring: connect, reset the schema, fire the workers.

use std::sync::Arc;

use anyhow::{Context, Result};
use deadlockctl_core::{
    pool, simulate, DispatchSummary, Engine, SimulatorConfig, TransactionExecutor,
    DEADLOCKING_STATEMENT,
};
use tracing::{error, info, warn};

/// Run one contention round against `connection_string`.
pub async fn run(engine: Engine, connection_string: &str, config: SimulatorConfig) -> Result<()> {
    let executor = pool::connect(engine, connection_string, config.max_connections)
        .await
        .with_context(|| format!("failed to connect to {engine}"))?;

    run_with(executor, config).await?;
    Ok(())
}

/// Reset the schema through `executor`, then fire the workers.
///
/// Bootstrap failures are returned; worker failures are handled inside each
/// worker according to the engine.
pub async fn run_with(
    executor: Arc<dyn TransactionExecutor>,
    config: SimulatorConfig,
) -> Result<DispatchSummary> {
    executor
        .bootstrap()
        .await
        .context("failed to bootstrap schema")?;

    let summary = simulate(config.concurrency, move || {
        let executor = Arc::clone(&executor);
        async move { run_transaction(executor.as_ref()).await }
    })
    .await;

    info!(
        completed = summary.completed,
        panicked = summary.panicked,
        "run finished"
    );
    Ok(summary)
}

async fn run_transaction(executor: &dyn TransactionExecutor) {
    let engine = executor.engine();
    if let Err(err) = executor.execute(DEADLOCKING_STATEMENT).await {
        if engine.transaction_errors_are_fatal() {
            error!(%engine, error = %err, "transaction failed");
            std::process::exit(1);
        }
        warn!(%engine, error = %err, "transaction failed");
    }
}
