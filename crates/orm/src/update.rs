use crate::column::IntoColumns;
use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::filter::{Assignment, Predicate};
use crate::query::Query;
use crate::select::list;
use crate::statement::{Clause, Statement, StatementKind};
use crate::value::Value;

/// Builder for `UPDATE` statements. Returned rows are tuples.
pub struct UpdateBuilder<'e> {
    engine: &'e Engine,
    statement: Statement,
}

impl<'e> UpdateBuilder<'e> {
    pub(crate) fn new(engine: &'e Engine, assignments: &[Assignment]) -> Self {
        let Some(first) = assignments.first() else {
            let mut statement = Statement::new(StatementKind::Update, "");
            statement.fail(Error::InvalidUpdateTarget(
                "update takes at least one assignment; use replace for whole records",
            ));
            return Self { engine, statement };
        };

        let table = first.table();
        let mut statement = Statement::new(StatementKind::Update, table);
        if let Some(other) = assignments.iter().find(|assignment| assignment.table() != table) {
            statement.fail(Error::CrossTableSelection {
                expected: table.to_string(),
                found: other.table().to_string(),
            });
            return Self { engine, statement };
        }

        let mut targets = Vec::with_capacity(assignments.len());
        let mut values = Vec::new();
        for assignment in assignments {
            let fragment = assignment.render();
            targets.push(fragment.sql);
            values.extend(fragment.values);
        }

        statement.append(Clause::Update, format!("UPDATE {table}"), vec![]);
        statement.append(Clause::Set, format!("SET {}", targets.join(", ")), values);
        Self { engine, statement }
    }

    /// Adds the WHERE clause.
    #[must_use]
    pub fn r#where(mut self, predicate: Predicate) -> Self {
        self.statement.filter(&predicate);
        self
    }

    /// Return the listed columns of every updated row.
    #[must_use]
    pub fn returning(mut self, columns: impl IntoColumns) -> Self {
        let columns = columns.into_columns();
        match list(self.statement.table(), &columns, |column| column.name().to_string()) {
            Ok(list) => self.statement.append(Clause::Returning, format!("RETURNING {list}"), vec![]),
            Err(err) => self.statement.fail(err),
        }
        self
    }

    /// Return every column of every updated row.
    #[must_use]
    pub fn returning_all(mut self) -> Self {
        self.statement.append(Clause::Returning, "RETURNING *", vec![]);
        self
    }

    /// Adds ascending ORDER BY clause.
    #[must_use]
    pub fn order_by(self, columns: impl IntoColumns) -> Self {
        self.order(columns, "ASC")
    }

    /// Adds descending ORDER BY clause.
    #[must_use]
    pub fn order_by_desc(self, columns: impl IntoColumns) -> Self {
        self.order(columns, "DESC")
    }

    /// Sets the maximum number of rows to update. Requires a RETURNING clause.
    ///
    /// The bundled `SQLite` is built without `UPDATE ... LIMIT` support, so it
    /// rejects the rendered statement with a syntax error, surfaced as
    /// [`Error::Storage`].
    #[must_use]
    pub fn limit(mut self, limit: i64) -> Self {
        self.statement.append(Clause::Limit, "LIMIT ?", vec![Value::Integer(limit)]);
        self
    }

    /// Sets the number of rows to skip. Requires a RETURNING clause.
    ///
    /// Subject to the same backend limitation as [`UpdateBuilder::limit`].
    #[must_use]
    pub fn offset(mut self, offset: i64) -> Self {
        self.statement.append(Clause::Offset, "OFFSET ?", vec![Value::Integer(offset)]);
        self
    }

    /// Build the UPDATE query without executing it.
    ///
    /// # Errors
    ///
    /// Returns an error if the accumulated clauses do not form a valid statement.
    pub fn build(&self) -> Result<Query> {
        self.statement.render()
    }

    /// Execute the update, returning the RETURNING rows (none without one).
    ///
    /// # Errors
    ///
    /// Returns an error if the statement is invalid or the storage engine
    /// rejects it.
    pub fn all(&self) -> Result<Vec<Vec<Value>>> {
        self.engine.fetch_all(&self.build()?)
    }

    /// Execute the update, returning the first RETURNING row.
    ///
    /// # Errors
    ///
    /// Returns an error if the statement is invalid or the storage engine
    /// rejects it.
    pub fn first(&self) -> Result<Option<Vec<Value>>> {
        self.engine.fetch_first(&self.build()?)
    }

    fn order(mut self, columns: impl IntoColumns, direction: &str) -> Self {
        let columns = columns.into_columns();
        match list(self.statement.table(), &columns, |column| column.name().to_string()) {
            Ok(list) => {
                self.statement.append(Clause::OrderBy, format!("ORDER BY {list} {direction}"), vec![]);
            }
            Err(err) => self.statement.fail(err),
        }
        self
    }
}
