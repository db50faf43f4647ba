use std::fmt;

use sqlx::any::{Any, AnyArguments};
use sqlx::query::Query;

/// SQL type of a [`Value`], kept for nulls so the driver declares the
/// parameter with the column's type instead of a generic integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Bool,
    Int,
    Float,
    Text,
    Bytes,
}

/// A positional argument bound to a [`Command`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null(ValueKind),
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
}

/// Rust types that map onto one [`ValueKind`].
pub trait SqlType: Into<Value> {
    const KIND: ValueKind;
}

macro_rules! impl_value_from {
    ($($ty:ty => $kind:ident, |$v:ident| $value:expr;)*) => {
        $(
            impl From<$ty> for Value {
                fn from($v: $ty) -> Self {
                    Value::$kind($value)
                }
            }

            impl SqlType for $ty {
                const KIND: ValueKind = ValueKind::$kind;
            }
        )*
    };
}

impl_value_from! {
    bool => Bool, |v| v;
    i32 => Int, |v| i64::from(v);
    i64 => Int, |v| v;
    f64 => Float, |v| v;
    String => Text, |v| v;
    &str => Text, |v| v.to_string();
    Vec<u8> => Bytes, |v| v;
}

impl<T: SqlType> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null(T::KIND), Into::into)
    }
}

/// A parameterized statement and its positional arguments.
///
/// The SQL text is passed to the driver verbatim, so placeholders must use the
/// syntax of the connected backend (`$1` for Postgres, `?` for MySQL and SQLite).
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    sql: String,
    args: Vec<Value>,
}

impl Command {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            args: Vec::new(),
        }
    }

    /// Append the next positional argument.
    pub fn bind(mut self, value: impl Into<Value>) -> Self {
        self.args.push(value.into());
        self
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// Build a sqlx query with every argument bound in order.
    pub(crate) fn to_query(&self) -> Query<'_, Any, AnyArguments<'_>> {
        self.args
            .iter()
            .fold(sqlx::query(&self.sql), |query, value| match value {
                Value::Null(ValueKind::Bool) => query.bind(None::<bool>),
                Value::Null(ValueKind::Int) => query.bind(None::<i64>),
                Value::Null(ValueKind::Float) => query.bind(None::<f64>),
                Value::Null(ValueKind::Text) => query.bind(None::<String>),
                Value::Null(ValueKind::Bytes) => query.bind(None::<Vec<u8>>),
                Value::Bool(v) => query.bind(*v),
                Value::Int(v) => query.bind(*v),
                Value::Float(v) => query.bind(*v),
                Value::Text(v) => query.bind(v.clone()),
                Value::Bytes(v) => query.bind(v.clone()),
            })
    }
}

/// Predicate over the number of records a step affected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expectation {
    Exactly(u64),
    AtLeast(u64),
    AtMost(u64),
    /// Any count is accepted; only execution errors abort the unit of work.
    Any,
}

impl Expectation {
    pub fn is_satisfied_by(&self, rows_affected: u64) -> bool {
        match *self {
            Expectation::Exactly(n) => rows_affected == n,
            Expectation::AtLeast(n) => rows_affected >= n,
            Expectation::AtMost(n) => rows_affected <= n,
            Expectation::Any => true,
        }
    }
}

impl fmt::Display for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expectation::Exactly(n) => write!(f, "exactly {n}"),
            Expectation::AtLeast(n) => write!(f, "at least {n}"),
            Expectation::AtMost(n) => write!(f, "at most {n}"),
            Expectation::Any => f.write_str("any number of"),
        }
    }
}

/// One mutating operation of a unit of work plus its expected effect.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    label: String,
    command: Command,
    expectation: Expectation,
}

impl Step {
    /// Create a step expecting exactly one affected record, the common case
    /// for keyed updates and deletes.
    pub fn new(label: impl Into<String>, command: Command) -> Self {
        Self {
            label: label.into(),
            command,
            expectation: Expectation::Exactly(1),
        }
    }

    pub fn expecting(mut self, expectation: Expectation) -> Self {
        self.expectation = expectation;
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn command(&self) -> &Command {
        &self.command
    }

    pub fn expectation(&self) -> Expectation {
        self.expectation
    }
}
