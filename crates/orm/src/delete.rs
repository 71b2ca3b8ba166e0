use std::marker::PhantomData;

use crate::column::{IntoColumns, Selection};
use crate::engine::Engine;
use crate::entity::FromRow;
use crate::error::{Error, Result};
use crate::filter::Predicate;
use crate::query::Query;
use crate::select::list;
use crate::statement::{Clause, Statement, StatementKind};
use crate::value::Value;

/// Builder for `DELETE` statements.
///
/// Deletes accept only WHERE and RETURNING. With `returning_all` the deleted
/// rows materialize as records; with `returning` they are tuples.
pub struct DeleteBuilder<'e, R> {
    engine: &'e Engine,
    statement: Statement,
    _marker: PhantomData<fn() -> R>,
}

impl<'e, R: FromRow> DeleteBuilder<'e, R> {
    pub(crate) fn new(engine: &'e Engine, target: Selection) -> Self {
        let statement = match target {
            Selection::Table(schema) => {
                let mut statement = Statement::new(StatementKind::Delete, &schema.table_name);
                statement.append(Clause::Delete, format!("DELETE FROM {}", schema.table_name), vec![]);
                statement
            }
            Selection::Columns(columns) => {
                let table = columns.first().map(|column| column.table().to_string());
                let mut statement = Statement::new(StatementKind::Delete, table.unwrap_or_default());
                statement.fail(Error::InvalidDeleteTarget(
                    "delete takes a whole table, not a column projection",
                ));
                statement
            }
        };

        Self {
            engine,
            statement,
            _marker: PhantomData,
        }
    }

    /// Adds the WHERE clause.
    #[must_use]
    pub fn r#where(mut self, predicate: Predicate) -> Self {
        self.statement.filter(&predicate);
        self
    }

    /// Return the listed columns of every deleted row, as tuples.
    #[must_use]
    pub fn returning(mut self, columns: impl IntoColumns) -> DeleteBuilder<'e, Vec<Value>> {
        let columns = columns.into_columns();
        match list(self.statement.table(), &columns, |column| column.name().to_string()) {
            Ok(list) => self.statement.append(Clause::Returning, format!("RETURNING {list}"), vec![]),
            Err(err) => self.statement.fail(err),
        }

        DeleteBuilder {
            engine: self.engine,
            statement: self.statement,
            _marker: PhantomData,
        }
    }

    /// Return every column of every deleted row.
    #[must_use]
    pub fn returning_all(mut self) -> Self {
        self.statement.append(Clause::Returning, "RETURNING *", vec![]);
        self
    }

    /// Build the DELETE query without executing it.
    ///
    /// # Errors
    ///
    /// Returns an error if the accumulated clauses do not form a valid statement.
    pub fn build(&self) -> Result<Query> {
        self.statement.render()
    }

    /// Execute the delete, returning the RETURNING rows (none without one).
    ///
    /// # Errors
    ///
    /// Returns an error if the statement is invalid, the storage engine
    /// rejects it, or a returned row cannot be materialized.
    pub fn all(&self) -> Result<Vec<R>> {
        self.engine.fetch_all(&self.build()?)
    }

    /// Execute the delete, returning the first RETURNING row.
    ///
    /// # Errors
    ///
    /// Returns an error if the statement is invalid, the storage engine
    /// rejects it, or the returned row cannot be materialized.
    pub fn first(&self) -> Result<Option<R>> {
        self.engine.fetch_first(&self.build()?)
    }
}
