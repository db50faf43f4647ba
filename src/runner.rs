use std::sync::Arc;

use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::{
    Command, Outcome, RollbackReason, Step, TransactionAware, TransactionError, TransactionResult,
    UnitOfWork, UnitOfWorkSession,
};

/// Runs ordered steps as one all-or-nothing transaction.
///
/// The runner borrows its store; every call to [`run`](Self::run) begins a
/// fresh session and never retries. Callers wanting a retry run the steps
/// again as a new unit of work.
pub struct UnitOfWorkRunner<'a, U: UnitOfWork> {
    uow: &'a U,
    observers: Vec<Arc<dyn TransactionAware>>,
}

impl<'a, U: UnitOfWork> UnitOfWorkRunner<'a, U> {
    pub fn new(uow: &'a U) -> Self {
        Self {
            uow,
            observers: Vec::new(),
        }
    }

    /// Register an observer on every session this runner begins.
    pub fn with_observer(mut self, observer: Arc<dyn TransactionAware>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Execute `steps` in order and commit only if each one meets its expectation.
    pub async fn run(&self, steps: Vec<Step>) -> Outcome {
        let span = info_span!("unit_of_work", id = %Uuid::new_v4(), steps = steps.len());
        self.run_steps(steps).instrument(span).await
    }

    async fn run_steps(&self, steps: Vec<Step>) -> Outcome {
        let session = match self.uow.begin().await {
            Ok(session) => session,
            Err(error) => {
                warn!(%error, "could not begin transaction");
                return Outcome::RolledBack {
                    reason: RollbackReason::AcquisitionFailure(error),
                    rollback_error: None,
                };
            }
        };
        for observer in &self.observers {
            session.register_transaction_aware(Arc::clone(observer));
        }
        let guard = RollbackGuard::new(session);

        let mut rows_affected = Vec::with_capacity(steps.len());
        for (index, step) in steps.into_iter().enumerate() {
            let number = index + 1;
            debug!(step = number, label = step.label(), sql = step.command().sql(), "executing step");

            let executed = guard.execute(step.command()).await;
            let observed = match executed {
                Ok(observed) => observed,
                Err(source) => {
                    let reason = RollbackReason::ExecutionFailure {
                        step: number,
                        label: step.label().to_string(),
                        source,
                    };
                    return abort(guard, reason).await;
                }
            };

            if !step.expectation().is_satisfied_by(observed) {
                let reason = RollbackReason::ExpectationViolation {
                    step: number,
                    label: step.label().to_string(),
                    expected: step.expectation(),
                    observed,
                };
                return abort(guard, reason).await;
            }
            rows_affected.push(observed);
        }

        match guard.commit().await {
            Ok(()) => {
                info!(?rows_affected, "unit of work committed");
                Outcome::Committed { rows_affected }
            }
            Err(error) => {
                warn!(%error, "commit failed, transaction discarded");
                Outcome::RolledBack {
                    reason: RollbackReason::CommitFailure(error),
                    rollback_error: None,
                }
            }
        }
    }
}

async fn abort<S: UnitOfWorkSession>(guard: RollbackGuard<S>, reason: RollbackReason) -> Outcome {
    warn!(%reason, "rolling back unit of work");
    let rollback_error = guard.rollback().await.err();
    if let Some(error) = &rollback_error {
        warn!(%error, "rollback failed");
    }
    Outcome::RolledBack {
        reason,
        rollback_error,
    }
}

/// Holds a session until it is explicitly committed or rolled back.
///
/// If the guard is dropped first (a step panicked, or the `run` future was
/// dropped mid-flight) the session is dropped with it, which discards the
/// transaction.
struct RollbackGuard<S: UnitOfWorkSession> {
    session: Option<S>,
}

impl<S: UnitOfWorkSession> RollbackGuard<S> {
    fn new(session: S) -> Self {
        Self {
            session: Some(session),
        }
    }

    async fn execute(&self, command: &Command) -> TransactionResult<u64> {
        let session = self.session.as_ref().ok_or(TransactionError::SessionClosed)?;
        session.execute(command).await
    }

    async fn commit(mut self) -> TransactionResult<()> {
        let session = self.session.take().ok_or(TransactionError::SessionClosed)?;
        session.commit().await
    }

    async fn rollback(mut self) -> TransactionResult<()> {
        let session = self.session.take().ok_or(TransactionError::SessionClosed)?;
        session.rollback().await
    }
}

impl<S: UnitOfWorkSession> Drop for RollbackGuard<S> {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            warn!("unit of work abandoned before completion, discarding transaction");
            drop(session);
        }
    }
}
