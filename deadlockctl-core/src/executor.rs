//! Per-engine transaction executors
//!
//! The two engines deliberately differ in error fatality:
//!
//! - MySQL: the driver takes one statement per call, so the text is split into
//!   fragments and run one by one on a single pooled connection. A failing
//!   fragment is logged and the rest still run.
//! - Postgres: the whole text goes out in one simple-query call, and any error
//!   is returned to the caller, which treats it as fatal.

use async_trait::async_trait;
use sqlx::{MySqlConnection, MySqlPool, PgPool};
use tracing::{debug, info, warn};

use crate::engine::Engine;
use crate::error::Result;
use crate::schema;

/// Split statement text into fragments: `;`-separated, trimmed, non-empty.
pub fn split_fragments(text: &str) -> impl Iterator<Item = &str> {
    text.split(';').map(str::trim).filter(|f| !f.is_empty())
}

/// Something that can run a single SQL statement.
#[async_trait]
pub trait StatementSink: Send {
    async fn execute_statement(&mut self, statement: &str) -> std::result::Result<(), sqlx::Error>;
}

#[async_trait]
impl StatementSink for MySqlConnection {
    async fn execute_statement(&mut self, statement: &str) -> std::result::Result<(), sqlx::Error> {
        // Text protocol: BEGIN/COMMIT are not valid prepared statements.
        // Called through the trait so the future borrows `self` for one
        // concrete lifetime, which the boxed `Send` future requires.
        sqlx::Executor::execute(&mut *self, sqlx::raw_sql(statement)).await?;
        Ok(())
    }
}

/// Counts from one [`execute_fragments`] call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FragmentOutcome {
    /// Fragments handed to the sink
    pub executed: usize,
    /// Fragments the sink rejected
    pub failed: usize,
}

/// Run every fragment of `text` on `sink` in order. Errors are logged and do
/// not stop later fragments.
pub async fn execute_fragments<S>(sink: &mut S, text: &str) -> FragmentOutcome
where
    S: StatementSink + ?Sized,
{
    let mut outcome = FragmentOutcome::default();
    for fragment in split_fragments(text) {
        outcome.executed += 1;
        if let Err(err) = sink.execute_statement(fragment).await {
            outcome.failed += 1;
            warn!(error = %err, statement = fragment, "statement failed");
        }
    }
    outcome
}

/// Runs the schema reset and the contended transaction for one engine.
#[async_trait]
pub trait TransactionExecutor: Send + Sync {
    fn engine(&self) -> Engine;

    /// Drop and recreate `posts`/`comments` and seed the parent row.
    async fn bootstrap(&self) -> Result<()>;

    /// Execute one transaction's worth of statement text.
    async fn execute(&self, statement: &str) -> Result<()>;
}

pub struct MySqlExecutor {
    pool: MySqlPool,
}

impl MySqlExecutor {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    async fn run_fragments(&self, text: &str) -> Result<FragmentOutcome> {
        // One connection for the whole text so BEGIN..COMMIT share a session.
        let mut conn = self.pool.acquire().await?;
        Ok(execute_fragments(&mut *conn, text).await)
    }
}

#[async_trait]
impl TransactionExecutor for MySqlExecutor {
    fn engine(&self) -> Engine {
        Engine::MySql
    }

    async fn bootstrap(&self) -> Result<()> {
        let outcome = self.run_fragments(schema::MYSQL_SCHEMA).await?;
        if outcome.failed > 0 {
            warn!(
                failed = outcome.failed,
                executed = outcome.executed,
                "schema bootstrap had failing statements"
            );
        } else {
            info!(statements = outcome.executed, "schema ready");
        }
        Ok(())
    }

    async fn execute(&self, statement: &str) -> Result<()> {
        let outcome = self.run_fragments(statement).await?;
        debug!(
            executed = outcome.executed,
            failed = outcome.failed,
            "transaction finished"
        );
        Ok(())
    }
}

pub struct PostgresExecutor {
    pool: PgPool,
}

impl PostgresExecutor {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl TransactionExecutor for PostgresExecutor {
    fn engine(&self) -> Engine {
        Engine::Postgres
    }

    async fn bootstrap(&self) -> Result<()> {
        sqlx::raw_sql(schema::POSTGRES_SCHEMA)
            .execute(&self.pool)
            .await?;
        info!("schema ready");
        Ok(())
    }

    async fn execute(&self, statement: &str) -> Result<()> {
        sqlx::raw_sql(statement).execute(&self.pool).await?;
        debug!("transaction finished");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records every statement; fails the ones listed in `reject`.
    #[derive(Default)]
    struct RecordingSink {
        seen: Vec<String>,
        reject: Vec<&'static str>,
    }

    #[async_trait]
    impl StatementSink for RecordingSink {
        async fn execute_statement(
            &mut self,
            statement: &str,
        ) -> std::result::Result<(), sqlx::Error> {
            self.seen.push(statement.to_string());
            if self.reject.iter().any(|r| *r == statement) {
                return Err(sqlx::Error::Protocol(format!("rejected: {statement}")));
            }
            Ok(())
        }
    }

    #[test]
    fn split_trims_and_skips_empty_fragments() {
        let text = "  BEGIN ;\n\tSELECT 1;;   ; COMMIT;\n  ";
        let fragments: Vec<_> = split_fragments(text).collect();
        assert_eq!(fragments, vec!["BEGIN", "SELECT 1", "COMMIT"]);
    }

    #[test]
    fn split_of_blank_text_is_empty() {
        assert_eq!(split_fragments("").count(), 0);
        assert_eq!(split_fragments(" ; \n ;").count(), 0);
    }

    #[test]
    fn split_keeps_text_without_separator() {
        let fragments: Vec<_> = split_fragments("  SELECT 1  ").collect();
        assert_eq!(fragments, vec!["SELECT 1"]);
    }

    #[tokio::test]
    async fn one_sink_call_per_fragment() {
        let mut sink = RecordingSink::default();
        let outcome = execute_fragments(&mut sink, schema::DEADLOCKING_STATEMENT).await;

        assert_eq!(outcome, FragmentOutcome { executed: 4, failed: 0 });
        assert_eq!(
            sink.seen,
            vec![
                "BEGIN",
                "INSERT INTO comments (post_id) VALUES (1)",
                "UPDATE posts SET comments_count = comments_count + 1 WHERE id = 1",
                "COMMIT",
            ]
        );
    }

    #[tokio::test]
    async fn failing_fragment_does_not_stop_the_rest() {
        let mut sink = RecordingSink {
            reject: vec!["INSERT INTO comments (post_id) VALUES (1)"],
            ..Default::default()
        };
        let outcome = execute_fragments(&mut sink, schema::DEADLOCKING_STATEMENT).await;

        assert_eq!(outcome, FragmentOutcome { executed: 4, failed: 1 });
        assert_eq!(sink.seen.last().map(String::as_str), Some("COMMIT"));
    }

    #[tokio::test]
    async fn trailing_separators_issue_no_calls() {
        let mut sink = RecordingSink::default();
        let outcome = execute_fragments(&mut sink, "SELECT 1;;;\n").await;
        assert_eq!(outcome.executed, 1);
        assert_eq!(sink.seen, vec!["SELECT 1"]);
    }

    // Integration tests require a real database
    // Run with: MYSQL_URL=mysql://... DATABASE_URL=postgres://... cargo test -- --ignored

    async fn mysql_count(pool: &MySqlPool, table: &str) -> i64 {
        sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(pool)
            .await
            .expect("count query failed")
    }

    async fn postgres_count(pool: &PgPool, table: &str) -> i64 {
        sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(pool)
            .await
            .expect("count query failed")
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn mysql_bootstrap_is_idempotent() {
        let url = std::env::var("MYSQL_URL").expect("MYSQL_URL required");
        let pool = MySqlPool::connect(&url).await.expect("connect failed");
        let executor = MySqlExecutor::new(pool);

        executor.bootstrap().await.expect("first bootstrap");
        executor
            .execute(schema::DEADLOCKING_STATEMENT)
            .await
            .expect("transaction");
        executor.bootstrap().await.expect("second bootstrap");

        assert_eq!(mysql_count(executor.pool(), "posts").await, 1);
        assert_eq!(mysql_count(executor.pool(), "comments").await, 0);
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn postgres_bootstrap_is_idempotent() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let pool = PgPool::connect(&url).await.expect("connect failed");
        let executor = PostgresExecutor::new(pool);

        executor.bootstrap().await.expect("first bootstrap");
        executor
            .execute(schema::DEADLOCKING_STATEMENT)
            .await
            .expect("transaction");
        executor.bootstrap().await.expect("second bootstrap");

        assert_eq!(postgres_count(executor.pool(), "posts").await, 1);
        assert_eq!(postgres_count(executor.pool(), "comments").await, 0);
    }
}
