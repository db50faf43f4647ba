use crate::step::Expectation;
use crate::TransactionError;

/// Why a unit of work did not commit.
///
/// Step numbers are 1-based, in the order the steps were supplied.
#[derive(Debug, thiserror::Error)]
pub enum RollbackReason {
    #[error("could not begin transaction: {0}")]
    AcquisitionFailure(#[source] TransactionError),

    #[error("step {step} ({label}) failed: {source}")]
    ExecutionFailure {
        step: usize,
        label: String,
        #[source]
        source: TransactionError,
    },

    #[error("step {step} ({label}) expected {expected} affected row(s), got {observed}")]
    ExpectationViolation {
        step: usize,
        label: String,
        expected: Expectation,
        observed: u64,
    },

    #[error("commit failed: {0}")]
    CommitFailure(#[source] TransactionError),
}

impl RollbackReason {
    /// The step that caused the rollback, if one did.
    pub fn step(&self) -> Option<usize> {
        match self {
            RollbackReason::ExecutionFailure { step, .. }
            | RollbackReason::ExpectationViolation { step, .. } => Some(*step),
            RollbackReason::AcquisitionFailure(_) | RollbackReason::CommitFailure(_) => None,
        }
    }
}

/// Result of running a unit of work.
#[derive(Debug)]
#[must_use]
pub enum Outcome {
    /// Every step met its expectation and the transaction committed.
    Committed { rows_affected: Vec<u64> },

    /// Nothing was made durable.
    RolledBack {
        reason: RollbackReason,
        /// Set when the explicit rollback also failed. The store still
        /// discards the transaction once the session is dropped.
        rollback_error: Option<TransactionError>,
    },
}

impl Outcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, Outcome::Committed { .. })
    }

    /// Per-step affected counts of a committed unit of work.
    pub fn rows_affected(&self) -> Option<&[u64]> {
        match self {
            Outcome::Committed { rows_affected } => Some(rows_affected),
            Outcome::RolledBack { .. } => None,
        }
    }

    pub fn reason(&self) -> Option<&RollbackReason> {
        match self {
            Outcome::Committed { .. } => None,
            Outcome::RolledBack { reason, .. } => Some(reason),
        }
    }

    /// Convert into a `Result`, dropping any secondary rollback error.
    pub fn into_result(self) -> Result<Vec<u64>, RollbackReason> {
        match self {
            Outcome::Committed { rows_affected } => Ok(rows_affected),
            Outcome::RolledBack { reason, .. } => Err(reason),
        }
    }
}
