use std::marker::PhantomData;

use crate::column::{Column, IntoColumns, Selection, check_same_table};
use crate::engine::Engine;
use crate::entity::FromRow;
use crate::error::{Error, Result};
use crate::filter::Predicate;
use crate::query::Query;
use crate::statement::{Clause, Statement, StatementKind};
use crate::value::Value;

/// Builder for `SELECT` statements.
///
/// Selecting a whole table yields records (`R` is the entity type); selecting
/// columns, or grouping, yields tuples (`R` is `Vec<Value>`).
pub struct SelectBuilder<'e, R> {
    engine: &'e Engine,
    statement: Statement,
    _marker: PhantomData<fn() -> R>,
}

impl<'e, R: FromRow> SelectBuilder<'e, R> {
    pub(crate) fn new(engine: &'e Engine, selection: Selection) -> Self {
        let statement = match selection {
            Selection::Table(schema) => {
                let mut statement = Statement::new(StatementKind::Select, &schema.table_name);
                statement.append(Clause::Select, "SELECT *", vec![]);
                statement.append(Clause::From, format!("FROM {}", schema.table_name), vec![]);
                statement
            }
            Selection::Columns(columns) => select_columns(&columns),
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

    /// Adds ascending ORDER BY clause.
    #[must_use]
    pub fn order_by(self, columns: impl IntoColumns) -> Self {
        self.order(columns.into_columns(), "ASC")
    }

    /// Adds descending ORDER BY clause.
    #[must_use]
    pub fn order_by_desc(self, columns: impl IntoColumns) -> Self {
        self.order(columns.into_columns(), "DESC")
    }

    /// Sets the maximum number of rows to return. `-1` means unbounded.
    #[must_use]
    pub fn limit(mut self, limit: i64) -> Self {
        self.statement.append(Clause::Limit, "LIMIT ?", vec![Value::Integer(limit)]);
        self
    }

    /// Sets the number of rows to skip.
    #[must_use]
    pub fn offset(mut self, offset: i64) -> Self {
        self.statement.append(Clause::Offset, "OFFSET ?", vec![Value::Integer(offset)]);
        self
    }

    /// Adds the GROUP BY clause. Grouped rows are returned as tuples.
    #[must_use]
    pub fn group_by(mut self, columns: impl IntoColumns) -> SelectBuilder<'e, Vec<Value>> {
        let columns = columns.into_columns();
        match list(self.statement.table(), &columns, |column| column.name().to_string()) {
            Ok(list) => self.statement.append(Clause::GroupBy, format!("GROUP BY {list}"), vec![]),
            Err(err) => self.statement.fail(err),
        }

        SelectBuilder {
            engine: self.engine,
            statement: self.statement,
            _marker: PhantomData,
        }
    }

    /// Build the SELECT query without executing it.
    ///
    /// # Errors
    ///
    /// Returns an error if the accumulated clauses do not form a valid statement.
    pub fn build(&self) -> Result<Query> {
        self.statement.render()
    }

    /// Execute the statement and return every row.
    ///
    /// # Errors
    ///
    /// Returns an error if the statement is invalid, the storage engine
    /// rejects it, or a row cannot be materialized.
    pub fn all(&self) -> Result<Vec<R>> {
        self.engine.fetch_all(&self.build()?)
    }

    /// Execute the statement and return the first row, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the statement is invalid, the storage engine
    /// rejects it, or the row cannot be materialized.
    pub fn first(&self) -> Result<Option<R>> {
        self.engine.fetch_first(&self.build()?)
    }

    fn order(mut self, columns: Vec<Column>, direction: &str) -> Self {
        match list(self.statement.table(), &columns, Column::render) {
            Ok(list) => {
                self.statement.append(Clause::OrderBy, format!("ORDER BY {list} {direction}"), vec![]);
            }
            Err(err) => self.statement.fail(err),
        }
        self
    }
}

fn select_columns(columns: &[Column]) -> Statement {
    let Some(first) = columns.first() else {
        let mut statement = Statement::new(StatementKind::Select, "");
        statement.fail(Error::InvalidSelection("at least one column must be selected"));
        return statement;
    };

    let mut statement = Statement::new(StatementKind::Select, first.table());
    match list(first.table(), columns, Column::render) {
        Ok(list) => {
            statement.append(Clause::Select, format!("SELECT {list}"), vec![]);
            statement.append(Clause::From, format!("FROM {}", first.table()), vec![]);
        }
        Err(err) => statement.fail(err),
    }
    statement
}

/// Comma-separated rendering of `columns`, which must be non-empty, carry at
/// most one aggregate each and all belong to `table`.
pub(crate) fn list(
    table: &str, columns: &[Column], render: impl Fn(&Column) -> String,
) -> Result<String> {
    if columns.is_empty() {
        return Err(Error::InvalidSelection("column list must not be empty"));
    }
    columns.iter().try_for_each(Column::validate)?;
    check_same_table(table, columns)?;
    Ok(columns.iter().map(render).collect::<Vec<_>>().join(", "))
}
