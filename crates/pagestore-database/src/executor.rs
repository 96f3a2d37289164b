//! The SQL execution seam.
//!
//! Stores and units of work only ever talk to an [`Executor`]. The pool
//! implementation borrows a connection per statement; the transaction
//! implementation funnels every statement through one open transaction.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::postgres::{PgArguments, PgPool, PgRow};
use sqlx::query::Query;
use sqlx::{Postgres, Transaction};
use tokio::sync::Mutex;
use tracing::debug;

use pagestore_core::error::AppError;
use pagestore_core::result::AppResult;
use pagestore_core::types::SqlValue;

use crate::error::map_sqlx_error;
use crate::sql::Statement;

/// Executes rendered statements against a backend.
///
/// Cancellation is by dropping the returned future; sqlx aborts the
/// in-flight query with it.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Run a statement and return the number of affected rows.
    async fn execute(&self, statement: Statement) -> AppResult<u64>;

    /// Run a query and return every row.
    async fn fetch_all(&self, statement: Statement) -> AppResult<Vec<PgRow>>;

    /// Run a query and return the first row, if any.
    async fn fetch_optional(&self, statement: Statement) -> AppResult<Option<PgRow>>;

    /// Run a query that must return a row; zero rows is `NotFound`.
    async fn fetch_one(&self, statement: Statement) -> AppResult<PgRow> {
        self.fetch_optional(statement)
            .await?
            .ok_or_else(|| AppError::not_found("no rows returned"))
    }

    /// Open a transaction and return an executor bound to it.
    async fn begin(&self) -> AppResult<Arc<dyn Executor>>;

    /// Commit the transaction this executor is bound to.
    async fn commit(&self) -> AppResult<()>;

    /// Roll back the transaction this executor is bound to.
    async fn rollback(&self) -> AppResult<()>;

    /// Whether statements run inside a transaction.
    fn in_transaction(&self) -> bool;
}

/// Executor over the shared connection pool.
#[derive(Debug, Clone)]
pub struct PgExecutor {
    pool: PgPool,
}

impl PgExecutor {
    /// Wrap a pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Executor for PgExecutor {
    async fn execute(&self, statement: Statement) -> AppResult<u64> {
        run_execute(&self.pool, statement).await
    }

    async fn fetch_all(&self, statement: Statement) -> AppResult<Vec<PgRow>> {
        run_fetch_all(&self.pool, statement).await
    }

    async fn fetch_optional(&self, statement: Statement) -> AppResult<Option<PgRow>> {
        run_fetch_optional(&self.pool, statement).await
    }

    async fn begin(&self) -> AppResult<Arc<dyn Executor>> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error(e, "Failed to begin transaction"))?;
        debug!("Transaction started");
        Ok(Arc::new(TxExecutor::new(tx)))
    }

    async fn commit(&self) -> AppResult<()> {
        Err(AppError::transaction("commit called without begin"))
    }

    async fn rollback(&self) -> AppResult<()> {
        Err(AppError::transaction("rollback called without begin"))
    }

    fn in_transaction(&self) -> bool {
        false
    }
}

/// Executor bound to one open transaction.
///
/// The transaction is single-threaded: the mutex serializes statements and the
/// slot empties on commit or rollback.
pub struct TxExecutor {
    tx: Mutex<Option<Transaction<'static, Postgres>>>,
}

impl TxExecutor {
    fn new(tx: Transaction<'static, Postgres>) -> Self {
        Self {
            tx: Mutex::new(Some(tx)),
        }
    }
}

fn finished() -> AppError {
    AppError::transaction("transaction already committed or rolled back")
}

#[async_trait]
impl Executor for TxExecutor {
    async fn execute(&self, statement: Statement) -> AppResult<u64> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(finished)?;
        run_execute(&mut **tx, statement).await
    }

    async fn fetch_all(&self, statement: Statement) -> AppResult<Vec<PgRow>> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(finished)?;
        run_fetch_all(&mut **tx, statement).await
    }

    async fn fetch_optional(&self, statement: Statement) -> AppResult<Option<PgRow>> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(finished)?;
        run_fetch_optional(&mut **tx, statement).await
    }

    async fn begin(&self) -> AppResult<Arc<dyn Executor>> {
        Err(AppError::transaction(
            "transaction already open; nest with a savepoint",
        ))
    }

    async fn commit(&self) -> AppResult<()> {
        let tx = self
            .tx
            .lock()
            .await
            .take()
            .ok_or_else(|| AppError::transaction("commit called without begin"))?;
        tx.commit()
            .await
            .map_err(|e| map_sqlx_error(e, "Failed to commit transaction"))?;
        debug!("Transaction committed");
        Ok(())
    }

    async fn rollback(&self) -> AppResult<()> {
        let tx = self
            .tx
            .lock()
            .await
            .take()
            .ok_or_else(|| AppError::transaction("rollback called without begin"))?;
        tx.rollback()
            .await
            .map_err(|e| map_sqlx_error(e, "Failed to roll back transaction"))?;
        debug!("Transaction rolled back");
        Ok(())
    }

    fn in_transaction(&self) -> bool {
        true
    }
}

fn bind_value(
    query: Query<'_, Postgres, PgArguments>,
    value: SqlValue,
) -> Query<'_, Postgres, PgArguments> {
    match value {
        SqlValue::Text(v) => query.bind(v),
        SqlValue::Int(v) => query.bind(v),
        SqlValue::Float(v) => query.bind(v),
        SqlValue::Bool(v) => query.bind(v),
        SqlValue::Date(v) => query.bind(v),
        SqlValue::Timestamp(v) => query.bind(v),
        SqlValue::Uuid(v) => query.bind(v),
        SqlValue::Json(v) => query.bind(v),
    }
}

fn prepare(sql: &str, values: Vec<SqlValue>) -> Query<'_, Postgres, PgArguments> {
    debug!(sql, binds = values.len(), "Executing statement");
    values.into_iter().fold(sqlx::query(sql), bind_value)
}

async fn run_execute<'c, E>(conn: E, statement: Statement) -> AppResult<u64>
where
    E: sqlx::Executor<'c, Database = Postgres>,
{
    let Statement { sql, values } = statement;
    prepare(&sql, values)
        .execute(conn)
        .await
        .map(|done| done.rows_affected())
        .map_err(|e| map_sqlx_error(e, "Failed to execute statement"))
}

async fn run_fetch_all<'c, E>(conn: E, statement: Statement) -> AppResult<Vec<PgRow>>
where
    E: sqlx::Executor<'c, Database = Postgres>,
{
    let Statement { sql, values } = statement;
    prepare(&sql, values)
        .fetch_all(conn)
        .await
        .map_err(|e| map_sqlx_error(e, "Failed to fetch rows"))
}

async fn run_fetch_optional<'c, E>(conn: E, statement: Statement) -> AppResult<Option<PgRow>>
where
    E: sqlx::Executor<'c, Database = Postgres>,
{
    let Statement { sql, values } = statement;
    prepare(&sql, values)
        .fetch_optional(conn)
        .await
        .map_err(|e| map_sqlx_error(e, "Failed to fetch row"))
}
