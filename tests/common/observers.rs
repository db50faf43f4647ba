use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::Arc;

use sql_unit_of_work::{TransactionAware, TransactionError, TransactionResult};

/// Transaction-aware observer that remembers which callback it received.
pub struct RecordingObserver {
    committed: Arc<RwLock<bool>>,
    rolled_back: Arc<RwLock<bool>>,
    fail: bool,
}

impl RecordingObserver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            committed: Arc::new(RwLock::new(false)),
            rolled_back: Arc::new(RwLock::new(false)),
            fail: false,
        })
    }

    /// An observer that records the callback and then reports an error.
    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            committed: Arc::new(RwLock::new(false)),
            rolled_back: Arc::new(RwLock::new(false)),
            fail: true,
        })
    }

    pub fn is_committed(&self) -> bool {
        *self.committed.read()
    }

    pub fn is_rolled_back(&self) -> bool {
        *self.rolled_back.read()
    }

    fn result(&self) -> TransactionResult<()> {
        if self.fail {
            return Err(TransactionError::CommitFailed("cache flush failed".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl TransactionAware for RecordingObserver {
    async fn on_commit(&self) -> TransactionResult<()> {
        *self.committed.write() = true;
        self.result()
    }

    async fn on_rollback(&self) -> TransactionResult<()> {
        *self.rolled_back.write() = true;
        self.result()
    }
}
