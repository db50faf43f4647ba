use async_trait::async_trait;
use parking_lot::RwLock;
use sqlx::{Any, AnyPool, Transaction};
use std::sync::Arc;
use tracing::warn;

use crate::{Command, Executor, TransactionAware, TransactionError, TransactionResult};

/// Unit of Work pattern for managing database transactions.
///
/// The UnitOfWork is the data store as seen by the runner: a factory for
/// transaction sessions.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    type Session: UnitOfWorkSession;

    /// Begin a new transaction session.
    async fn begin(&self) -> TransactionResult<Self::Session>;
}

/// Represents a single database transaction session.
///
/// A session that is dropped without `commit` or `rollback` must discard
/// every change made through it.
#[async_trait]
pub trait UnitOfWorkSession: Send + Sync {
    /// Run a mutating command and return the number of affected records.
    async fn execute(&self, command: &Command) -> TransactionResult<u64>;

    /// Register a component that needs to be notified of transaction events.
    fn register_transaction_aware(&self, observer: Arc<dyn TransactionAware>);

    /// Commit the transaction and notify all registered observers.
    ///
    /// If the commit is rejected the transaction is discarded before the
    /// error is returned.
    async fn commit(self) -> TransactionResult<()>;

    /// Rollback the transaction and notify all registered observers.
    async fn rollback(self) -> TransactionResult<()>;
}

/// UnitOfWork backed by a sqlx `AnyPool`.
pub struct SqlUnitOfWork {
    pool: Arc<AnyPool>,
}

impl SqlUnitOfWork {
    /// Create a new SqlUnitOfWork with the given connection pool.
    pub fn new(pool: Arc<AnyPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UnitOfWork for SqlUnitOfWork {
    type Session = SqlUnitOfWorkSession;

    async fn begin(&self) -> TransactionResult<Self::Session> {
        let tx = self.pool.begin().await?;
        Ok(SqlUnitOfWorkSession::new(tx))
    }
}

/// Session over one open sqlx transaction.
pub struct SqlUnitOfWorkSession {
    executor: Executor,
    observers: Arc<RwLock<Vec<Arc<dyn TransactionAware>>>>,
}

impl SqlUnitOfWorkSession {
    /// Create a new session from an open transaction.
    pub fn new(tx: Transaction<'static, Any>) -> Self {
        Self {
            executor: Executor::new(tx),
            observers: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Get the executor for this session, for repositories that issue their
    /// own queries inside the transaction.
    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    async fn notify(&self, committed: bool) {
        let observers = self.observers.read().clone();
        for observer in observers.iter() {
            let result = if committed {
                observer.on_commit().await
            } else {
                observer.on_rollback().await
            };
            // The store has already settled; an observer cannot change that.
            if let Err(error) = result {
                warn!(%error, committed, "transaction observer failed");
            }
        }
    }
}

#[async_trait]
impl UnitOfWorkSession for SqlUnitOfWorkSession {
    async fn execute(&self, command: &Command) -> TransactionResult<u64> {
        self.executor.execute(command).await
    }

    fn register_transaction_aware(&self, observer: Arc<dyn TransactionAware>) {
        self.observers.write().push(observer);
    }

    async fn commit(self) -> TransactionResult<()> {
        let tx = self.executor.take_transaction().await?;

        // A transaction dropped while still open is rolled back by sqlx, which
        // is what happens to `tx` when commit fails.
        if let Err(error) = tx.commit().await {
            self.notify(false).await;
            return Err(TransactionError::CommitFailed(error.to_string()));
        }

        self.notify(true).await;
        Ok(())
    }

    async fn rollback(self) -> TransactionResult<()> {
        let tx = self.executor.take_transaction().await?;

        let result = tx
            .rollback()
            .await
            .map_err(|error| TransactionError::RollbackFailed(error.to_string()));

        self.notify(false).await;
        result
    }
}
