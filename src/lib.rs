//! SQL Unit of Work
//!
//! Runs an ordered list of mutating steps inside one transaction and commits
//! only when every step affected the number of records it expected. Any
//! failure, at any point, leaves the database untouched and is reported as a
//! structured [`Outcome`].
//!
//! The data store is reached through the [`UnitOfWork`] and
//! [`UnitOfWorkSession`] traits. [`SqlUnitOfWork`] implements them over a sqlx
//! `AnyPool`, so the backend (Postgres, MySQL or SQLite) is picked by the
//! connection URL.

pub mod config;
pub mod executor;
pub mod outcome;
pub mod pool;
pub mod runner;
pub mod step;
pub mod transaction_aware;
pub mod unit_of_work;
pub mod users;

pub use config::{Backend, ConfigError, DatabaseConfig};
pub use executor::Executor;
pub use outcome::{Outcome, RollbackReason};
pub use runner::UnitOfWorkRunner;
pub use step::{Command, Expectation, SqlType, Step, Value, ValueKind};
pub use transaction_aware::{TransactionAware, TransactionError, TransactionResult};
pub use unit_of_work::{SqlUnitOfWork, SqlUnitOfWorkSession, UnitOfWork, UnitOfWorkSession};
pub use users::{NewUser, User, UserRepository};
