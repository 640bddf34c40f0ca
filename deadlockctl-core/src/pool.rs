//! Connection pools, one per engine
//!
//! Workers share a single sqlx pool. Pools connect eagerly so a bad
//! connection string fails before the schema reset, not inside a worker.

use std::sync::Arc;

use sqlx::mysql::MySqlPoolOptions;
use sqlx::postgres::PgPoolOptions;
use sqlx::{MySqlPool, PgPool};
use tracing::info;

use crate::engine::Engine;
use crate::error::Result;
use crate::executor::{MySqlExecutor, PostgresExecutor, TransactionExecutor};

/// Create a MySQL connection pool.
pub async fn create_mysql_pool(database_url: &str, max_connections: u32) -> Result<MySqlPool> {
    let pool = MySqlPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;
    Ok(pool)
}

/// Create a PostgreSQL connection pool.
pub async fn create_postgres_pool(database_url: &str, max_connections: u32) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;
    Ok(pool)
}

/// Connect to `database_url` and wrap the pool in the engine's executor.
///
/// # Errors
///
/// Returns an error if the initial connection fails.
pub async fn connect(
    engine: Engine,
    database_url: &str,
    max_connections: u32,
) -> Result<Arc<dyn TransactionExecutor>> {
    let executor: Arc<dyn TransactionExecutor> = match engine {
        Engine::MySql => Arc::new(MySqlExecutor::new(
            create_mysql_pool(database_url, max_connections).await?,
        )),
        Engine::Postgres => Arc::new(PostgresExecutor::new(
            create_postgres_pool(database_url, max_connections).await?,
        )),
    };
    info!(%engine, max_connections, "connected");
    Ok(executor)
}
