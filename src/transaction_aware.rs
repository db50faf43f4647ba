use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum TransactionError {
    #[error("Transaction commit failed: {0}")]
    CommitFailed(String),

    #[error("Transaction rollback failed: {0}")]
    RollbackFailed(String),

    /// The session already committed or rolled back; its executor no longer
    /// holds a transaction.
    #[error("Transaction session already closed")]
    SessionClosed,

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

pub type TransactionResult<T> = Result<T, TransactionError>;

/// Hook called once a session has settled.
///
/// Register observers on a session, or on every session of a
/// [`UnitOfWorkRunner`](crate::UnitOfWorkRunner) with `with_observer`. They
/// run after the store has decided, so an `Err` from a callback is logged and
/// the remaining observers still run; it never turns a committed unit of work
/// into a rolled-back one or the reverse.
#[async_trait]
pub trait TransactionAware: Send + Sync {
    /// The transaction is durable.
    async fn on_commit(&self) -> TransactionResult<()>;

    /// The transaction was rolled back, or discarded after a rejected commit.
    /// Nothing it wrote is visible.
    async fn on_rollback(&self) -> TransactionResult<()>;
}
