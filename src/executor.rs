use sqlx::{Any, Transaction};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::{Command, TransactionError, TransactionResult};

/// Executor wraps an open database transaction for use by repositories.
///
/// Clones share the same transaction, so several repositories can take part in
/// one unit of work. Access is serialized by the mutex: statements on one
/// transaction never overlap.
#[derive(Clone, Debug)]
pub struct Executor {
    pub tx: Arc<Mutex<Option<Transaction<'static, Any>>>>,
}

impl Executor {
    /// Creates a new Executor from an open transaction.
    pub fn new(tx: Transaction<'static, Any>) -> Self {
        Self {
            tx: Arc::new(Mutex::new(Some(tx))),
        }
    }

    /// Runs a command inside the transaction and returns the affected row count.
    pub async fn execute(&self, command: &Command) -> TransactionResult<u64> {
        let mut tx_guard = self.tx.lock().await;
        let tx = tx_guard.as_mut().ok_or(TransactionError::SessionClosed)?;
        let result = command.to_query().execute(&mut **tx).await?;
        Ok(result.rows_affected())
    }

    /// Takes ownership of the transaction, leaving None in its place.
    /// Only the session calls this, when committing or rolling back.
    pub(crate) async fn take_transaction(&self) -> TransactionResult<Transaction<'static, Any>> {
        self.tx
            .lock()
            .await
            .take()
            .ok_or(TransactionError::SessionClosed)
    }
}
