//! Statement execution and record materialization.

use std::path::Path;

use keel_sql::{Backend, Connection, Row, SqlDefault};
use tracing::instrument;

use crate::column::Selectable;
use crate::delete::DeleteBuilder;
use crate::entity::{Entity, FromRow};
use crate::error::{Error, Result};
use crate::filter::Assignment;
use crate::insert::InsertBuilder;
use crate::query::Query;
use crate::schema::Schema;
use crate::select::SelectBuilder;
use crate::update::UpdateBuilder;
use crate::value::Value;

/// Owns a storage connection and runs statements against it.
///
/// Every executed statement is followed by a commit; inserts and replaces
/// commit once per batch. The engine is not internally synchronized: use one
/// engine per worker, or guard a shared one with a mutex.
#[derive(Debug)]
pub struct Engine {
    conn: Box<dyn Connection>,
}

impl Engine {
    /// An engine over an existing connection.
    pub fn new(conn: impl Connection) -> Self {
        Self { conn: Box::new(conn) }
    }

    /// Open the database at `path` with the bundled `SQLite` backend.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the database cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(SqlDefault::open(path)?))
    }

    /// A private in-memory `SQLite` database.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the database cannot be opened.
    pub fn in_memory() -> Result<Self> {
        Ok(Self::new(SqlDefault::in_memory()?))
    }

    /// Open the `SQLite` database configured by `SQL_DATABASE` and
    /// `SQL_FOREIGN_KEYS`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the options are invalid or the database
    /// cannot be opened.
    pub fn connect() -> Result<Self> {
        Ok(Self::new(SqlDefault::connect()?))
    }

    /// The underlying connection.
    #[must_use]
    pub fn connection(&self) -> &dyn Connection {
        self.conn.as_ref()
    }

    /// Create the table for `schema` unless it already exists.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the catalog cannot be read or the table
    /// cannot be created.
    #[instrument(skip_all, fields(table = %schema.table_name))]
    pub fn push(&self, schema: &Schema) -> Result<()> {
        if schema.exists(self.connection())? {
            tracing::debug!("table already exists");
            return Ok(());
        }
        schema.create(self.connection())?;
        self.conn.commit()?;
        Ok(())
    }

    /// Insert every record, writing the stored row (including generated
    /// primary keys) back onto it.
    ///
    /// The first failing record aborts the rest of the batch.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the storage engine rejects a row, or a
    /// materialization error if the returned row does not fit the record.
    #[instrument(skip_all, fields(table = %E::schema().table_name, count = records.len()))]
    pub fn insert<E: Entity>(&self, records: &mut [E]) -> Result<()> {
        self.write(records, false)
    }

    /// Replace every record as a whole row (`REPLACE INTO`), writing the
    /// stored row back onto it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the storage engine rejects a row, or a
    /// materialization error if the returned row does not fit the record.
    #[instrument(skip_all, fields(table = %E::schema().table_name, count = records.len()))]
    pub fn replace<E: Entity>(&self, records: &mut [E]) -> Result<()> {
        self.write(records, true)
    }

    /// Start a select statement over a whole table or a column projection.
    pub fn query<S: Selectable>(&self, selection: S) -> SelectBuilder<'_, S::Output>
    where
        S::Output: FromRow,
    {
        SelectBuilder::new(self, selection.into_selection())
    }

    /// Start an update statement from one or more assignments on one table.
    pub fn update(&self, assignments: impl IntoIterator<Item = Assignment>) -> UpdateBuilder<'_> {
        let assignments: Vec<Assignment> = assignments.into_iter().collect();
        UpdateBuilder::new(self, &assignments)
    }

    /// Start a delete statement over a whole table.
    pub fn delete<S: Selectable>(&self, target: S) -> DeleteBuilder<'_, S::Output>
    where
        S::Output: FromRow,
    {
        DeleteBuilder::new(self, target.into_selection())
    }

    /// Execute a rendered statement and commit.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the storage engine rejects the statement.
    pub fn execute(&self, query: &Query) -> Result<Vec<Row>> {
        let rows = self.conn.query(&query.sql, &query.params)?;
        self.conn.commit()?;
        Ok(rows)
    }

    pub(crate) fn fetch_all<R: FromRow>(&self, query: &Query) -> Result<Vec<R>> {
        self.execute(query)?.into_iter().map(materialize).collect()
    }

    pub(crate) fn fetch_first<R: FromRow>(&self, query: &Query) -> Result<Option<R>> {
        self.execute(query)?.into_iter().next().map(materialize).transpose()
    }

    fn write<E: Entity>(&self, records: &mut [E], replace: bool) -> Result<()> {
        let schema = E::schema();
        for record in records.iter_mut() {
            let builder = InsertBuilder::from_entity(record);
            let builder = if replace { builder.replace() } else { builder };
            let query = builder.build()?;

            let row = self.conn.query(&query.sql, &query.params)?.into_iter().next().ok_or_else(
                || Error::RowArityMismatch {
                    table: schema.table_name.clone(),
                    expected: schema.fields.len(),
                    actual: 0,
                },
            )?;
            record.apply_row(values(row))?;
        }
        self.conn.commit()?;
        Ok(())
    }
}

fn values(row: Row) -> Vec<Value> {
    row.into_values().into_iter().map(Value::from).collect()
}

fn materialize<R: FromRow>(row: Row) -> Result<R> {
    R::from_row(values(row))
}
