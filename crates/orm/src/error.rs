use std::sync::Arc;

use thiserror::Error;

use crate::column::Aggregate;
use crate::statement::{Clause, StatementKind};
use crate::value::FieldKind;

/// Result alias used throughout the ORM.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors raised while building, rendering or executing statements.
///
/// Everything except [`Error::Storage`] is detected locally before (or
/// instead of) reaching the storage engine.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// A comparison or arithmetic operand disagrees with the column's declared type.
    #[error("type mismatch on {table}.{field}: expected {expected}, found {found}")]
    TypeMismatch {
        /// Table owning the column.
        table: String,
        /// Column name.
        field: String,
        /// Declared type of the column.
        expected: FieldKind,
        /// Type of the rejected operand.
        found: &'static str,
    },

    /// The field is not declared on the schema.
    #[error("table '{table}' has no field '{field}'")]
    UnknownField {
        /// Table that was searched.
        table: String,
        /// Requested field name.
        field: String,
    },

    /// An `IN` list was empty.
    #[error("empty operand list for {table}.{field}")]
    EmptyOperand {
        /// Table owning the column.
        table: String,
        /// Column name.
        field: String,
    },

    /// A comparison, `IN` list or assignment was built from an aggregated
    /// column. Aggregated columns only appear in select lists, ORDER BY and
    /// GROUP BY.
    #[error("{aggregate}({field}) on '{table}' cannot be compared or assigned")]
    AggregatedOperand {
        /// Table owning the column.
        table: String,
        /// Column name.
        field: String,
        /// Attached aggregate.
        aggregate: Aggregate,
    },

    /// A second aggregate was applied to an already aggregated column.
    #[error("{outer} cannot be applied to {inner}({field}) on '{table}'")]
    NestedAggregate {
        /// Table owning the column.
        table: String,
        /// Column name.
        field: String,
        /// Aggregate attached first.
        inner: Aggregate,
        /// Aggregate applied on top of it.
        outer: Aggregate,
    },

    /// The same clause kind was added to one statement twice.
    #[error("{0} clause added more than once")]
    DuplicateClause(Clause),

    /// A mandatory clause was absent at render time.
    #[error("statement is missing its {0} clause")]
    MissingClause(Clause),

    /// The statement's clauses cannot be combined.
    #[error("unsupported clause combination: {0}")]
    UnsupportedCombination(&'static str),

    /// The clause is not part of this statement kind.
    #[error("{clause} is not supported on {kind} statements")]
    StatementKind {
        /// Statement being built.
        kind: StatementKind,
        /// Rejected clause.
        clause: Clause,
    },

    /// Columns from more than one table were combined in one statement.
    #[error("columns must belong to '{expected}' but '{found}' was given")]
    CrossTableSelection {
        /// Table of the statement.
        expected: String,
        /// Table of the offending column.
        found: String,
    },

    /// The selection passed to a query is not usable.
    #[error("invalid selection: {0}")]
    InvalidSelection(&'static str),

    /// The arguments passed to `update` are not assignments.
    #[error("invalid update target: {0}")]
    InvalidUpdateTarget(&'static str),

    /// The target passed to `delete` is not a whole table.
    #[error("invalid delete target: {0}")]
    InvalidDeleteTarget(&'static str),

    /// A result row does not have one value per declared field.
    #[error("row has {actual} values but table '{table}' declares {expected} fields")]
    RowArityMismatch {
        /// Table being materialized.
        table: String,
        /// Declared field count.
        expected: usize,
        /// Values in the row.
        actual: usize,
    },

    /// A stored value could not be converted into the field's host type.
    #[error("cannot decode {table}.{field}: {message}")]
    Decode {
        /// Table being materialized.
        table: String,
        /// Field being decoded.
        field: String,
        /// Conversion failure.
        message: String,
    },

    /// The storage engine rejected the statement. The engine's own error is
    /// carried unmodified.
    #[error("{0}")]
    Storage(Arc<anyhow::Error>),
}

impl Error {
    /// The storage engine's error, when this is [`Error::Storage`].
    ///
    /// Downcast it to reach engine-specific details such as constraint codes.
    #[must_use]
    pub fn storage(&self) -> Option<&anyhow::Error> {
        match self {
            Self::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Storage(Arc::new(err))
    }
}
