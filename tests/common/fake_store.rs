use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use sql_unit_of_work::{
    Command, TransactionAware, TransactionError, TransactionResult, UnitOfWork, UnitOfWorkSession,
};

/// Everything the fake store was asked to do, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Begin,
    Execute(String),
    Commit,
    Rollback,
    /// The session went away without an explicit commit or rollback, or the
    /// commit was rejected.
    Discarded,
}

#[derive(Debug, Clone)]
enum Response {
    Rows(u64),
    Fail(String),
    Panic,
}

#[derive(Default)]
struct State {
    fail_begin: bool,
    fail_commit: bool,
    fail_rollback: bool,
    responses: HashMap<String, Response>,
    events: Vec<Event>,
    durable: Vec<String>,
}

/// In-memory data store with scripted results.
///
/// Every command affects one row unless told otherwise. Executed commands only
/// become durable when their session commits.
#[derive(Clone, Default)]
pub struct FakeStore {
    state: Arc<Mutex<State>>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_begin(self) -> Self {
        self.state.lock().fail_begin = true;
        self
    }

    pub fn failing_commit(self) -> Self {
        self.state.lock().fail_commit = true;
        self
    }

    pub fn failing_rollback(self) -> Self {
        self.state.lock().fail_rollback = true;
        self
    }

    pub fn respond(self, sql: &str, rows: u64) -> Self {
        self.state
            .lock()
            .responses
            .insert(sql.to_string(), Response::Rows(rows));
        self
    }

    pub fn fail_on(self, sql: &str, message: &str) -> Self {
        self.state
            .lock()
            .responses
            .insert(sql.to_string(), Response::Fail(message.to_string()));
        self
    }

    pub fn panic_on(self, sql: &str) -> Self {
        self.state
            .lock()
            .responses
            .insert(sql.to_string(), Response::Panic);
        self
    }

    pub fn events(&self) -> Vec<Event> {
        self.state.lock().events.clone()
    }

    pub fn executed(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Event::Execute(sql) => Some(sql),
                _ => None,
            })
            .collect()
    }

    pub fn durable(&self) -> Vec<String> {
        self.state.lock().durable.clone()
    }
}

#[async_trait]
impl UnitOfWork for FakeStore {
    type Session = FakeSession;

    async fn begin(&self) -> TransactionResult<Self::Session> {
        let mut state = self.state.lock();
        if state.fail_begin {
            return Err(TransactionError::DatabaseError(sqlx::Error::PoolTimedOut));
        }
        state.events.push(Event::Begin);
        Ok(FakeSession {
            state: Arc::clone(&self.state),
            pending: Mutex::new(Vec::new()),
            finished: AtomicBool::new(false),
            observers: RwLock::new(Vec::new()),
        })
    }
}

pub struct FakeSession {
    state: Arc<Mutex<State>>,
    pending: Mutex<Vec<String>>,
    finished: AtomicBool,
    observers: RwLock<Vec<Arc<dyn TransactionAware>>>,
}

impl FakeSession {
    async fn notify(&self, committed: bool) {
        let observers = self.observers.read().clone();
        for observer in observers {
            let _ = if committed {
                observer.on_commit().await
            } else {
                observer.on_rollback().await
            };
        }
    }
}

#[async_trait]
impl UnitOfWorkSession for FakeSession {
    async fn execute(&self, command: &Command) -> TransactionResult<u64> {
        let response = {
            let mut state = self.state.lock();
            state.events.push(Event::Execute(command.sql().to_string()));
            state
                .responses
                .get(command.sql())
                .cloned()
                .unwrap_or(Response::Rows(1))
        };

        match response {
            Response::Rows(rows) => {
                self.pending.lock().push(command.sql().to_string());
                Ok(rows)
            }
            Response::Fail(message) => Err(TransactionError::DatabaseError(
                sqlx::Error::Protocol(message),
            )),
            Response::Panic => panic!("store crashed while running {}", command.sql()),
        }
    }

    fn register_transaction_aware(&self, observer: Arc<dyn TransactionAware>) {
        self.observers.write().push(observer);
    }

    async fn commit(self) -> TransactionResult<()> {
        self.finished.store(true, Ordering::SeqCst);
        let rejected = {
            let mut state = self.state.lock();
            if state.fail_commit {
                state.events.push(Event::Discarded);
                true
            } else {
                state.events.push(Event::Commit);
                let pending = std::mem::take(&mut *self.pending.lock());
                state.durable.extend(pending);
                false
            }
        };

        if rejected {
            self.notify(false).await;
            return Err(TransactionError::CommitFailed("serialization failure".to_string()));
        }
        self.notify(true).await;
        Ok(())
    }

    async fn rollback(self) -> TransactionResult<()> {
        self.finished.store(true, Ordering::SeqCst);
        let fail_rollback = {
            let mut state = self.state.lock();
            state.events.push(Event::Rollback);
            state.fail_rollback
        };
        self.pending.lock().clear();
        self.notify(false).await;

        if fail_rollback {
            return Err(TransactionError::RollbackFailed("connection lost".to_string()));
        }
        Ok(())
    }
}

impl Drop for FakeSession {
    fn drop(&mut self) {
        if !self.finished.load(Ordering::SeqCst) {
            self.state.lock().events.push(Event::Discarded);
        }
    }
}
