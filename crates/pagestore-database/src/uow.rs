//! Nested transactions.
//!
//! A [`UnitOfWork`] wraps one executor handle. Beginning on a handle that is
//! not yet transactional opens a transaction; beginning inside one issues a
//! `SAVEPOINT` with a random name instead, so nested scopes roll back without
//! touching their parents.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use tracing::{debug, error, warn};
use uuid::Uuid;

use pagestore_core::error::AppError;
use pagestore_core::result::AppResult;

use crate::executor::Executor;
use crate::sql::Statement;
use crate::store::{Store, StoredRecord};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Scope {
    /// Not begun; commit and rollback are errors.
    Root,
    /// Owns the transaction of its executor.
    Transaction,
    /// Owns a savepoint inside an enclosing transaction.
    Savepoint(String),
}

/// A transaction scope over one executor.
pub struct UnitOfWork {
    executor: Arc<dyn Executor>,
    scope: Scope,
}

impl UnitOfWork {
    /// A root scope over `executor`. Nothing is begun yet.
    pub fn new(executor: Arc<dyn Executor>) -> Self {
        Self {
            executor,
            scope: Scope::Root,
        }
    }

    /// The executor statements of this scope run on.
    pub fn executor(&self) -> &Arc<dyn Executor> {
        &self.executor
    }

    /// Whether this scope runs inside a transaction.
    pub fn in_transaction(&self) -> bool {
        self.executor.in_transaction()
    }

    /// `store` bound to this scope's executor.
    pub fn store<T: StoredRecord>(&self, store: &Store<T>) -> Store<T> {
        store.with_executor(Arc::clone(&self.executor))
    }

    /// Open a child scope: a transaction, or a savepoint when one is
    /// already open.
    pub async fn begin(&self) -> AppResult<UnitOfWork> {
        if !self.executor.in_transaction() {
            let executor = self.executor.begin().await?;
            return Ok(Self {
                executor,
                scope: Scope::Transaction,
            });
        }

        let name = format!("sp_{}", Uuid::new_v4().simple());
        self.executor
            .execute(Statement::raw(format!("SAVEPOINT {name}")))
            .await?;
        debug!(savepoint = %name, "Savepoint created");
        Ok(Self {
            executor: Arc::clone(&self.executor),
            scope: Scope::Savepoint(name),
        })
    }

    /// Make this scope's work permanent, or release its savepoint.
    pub async fn commit(self) -> AppResult<()> {
        match self.scope {
            Scope::Root => Err(AppError::transaction("commit called without begin")),
            Scope::Transaction => self.executor.commit().await,
            Scope::Savepoint(name) => {
                self.executor
                    .execute(Statement::raw(format!("RELEASE SAVEPOINT {name}")))
                    .await?;
                debug!(savepoint = %name, "Savepoint released");
                Ok(())
            }
        }
    }

    /// Discard this scope's work, or roll back to its savepoint.
    pub async fn rollback(self) -> AppResult<()> {
        match self.scope {
            Scope::Root => Err(AppError::transaction("rollback called without begin")),
            Scope::Transaction => self.executor.rollback().await,
            Scope::Savepoint(name) => {
                self.executor
                    .execute(Statement::raw(format!("ROLLBACK TO SAVEPOINT {name}")))
                    .await?;
                debug!(savepoint = %name, "Rolled back to savepoint");
                Ok(())
            }
        }
    }

    /// Run `f` in a child scope. Commits when `f` succeeds and rolls back
    /// when it fails or panics; a panic resumes after the rollback.
    ///
    /// ```ignore
    /// let author = uow
    ///     .run(|tx| Box::pin(async move {
    ///         let authors = tx.store(&authors);
    ///         authors.insert(&mut author).await?;
    ///         Ok(author)
    ///     }))
    ///     .await?;
    /// ```
    pub async fn run<F, R>(&self, f: F) -> AppResult<R>
    where
        F: for<'a> FnOnce(&'a UnitOfWork) -> BoxFuture<'a, AppResult<R>> + Send,
        R: Send,
    {
        let child = self.begin().await?;
        let outcome = AssertUnwindSafe(f(&child)).catch_unwind().await;

        match outcome {
            Ok(Ok(value)) => {
                child.commit().await?;
                Ok(value)
            }
            Ok(Err(err)) => {
                warn!(error = %err, "Rolling back unit of work after error");
                if let Err(rollback) = child.rollback().await {
                    error!(error = %rollback, "Rollback failed");
                }
                Err(err)
            }
            Err(panic) => {
                error!("Rolling back unit of work after panic");
                if let Err(rollback) = child.rollback().await {
                    error!(error = %rollback, "Rollback failed");
                }
                std::panic::resume_unwind(panic)
            }
        }
    }
}
