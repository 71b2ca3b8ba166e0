use std::marker::PhantomData;

use sea_query::{Alias, SimpleExpr};

use crate::entity::Entity;
use crate::error::{Error, Result};
use crate::query::{Query, QueryBuilder, to_sea_value, values_to_datatypes};
use crate::value::{Value, coerce};

/// Builder for `INSERT` (or `REPLACE`) statements returning the stored row.
pub struct InsertBuilder<E: Entity> {
    values: Vec<(&'static str, Value)>,
    replace: bool,
    error: Option<Error>,
    _marker: PhantomData<fn() -> E>,
}

impl<E: Entity> Default for InsertBuilder<E> {
    fn default() -> Self {
        Self {
            values: Vec::new(),
            replace: false,
            error: None,
            _marker: PhantomData,
        }
    }
}

impl<E: Entity> InsertBuilder<E> {
    /// Creates a new INSERT statement builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Populate every field from a record, in schema order.
    ///
    /// Primary-key fields holding an unset value (null, zero, empty) are
    /// left out so the storage engine assigns them.
    #[must_use]
    pub fn from_entity(entity: &E) -> Self {
        let values = E::schema()
            .fields
            .iter()
            .zip(entity.values())
            .filter(|(field, value)| !(field.primary_key && value.is_unset()))
            .map(|(field, value)| (field.name, value))
            .collect();

        Self {
            values,
            ..Self::default()
        }
    }

    /// Sets a field value, checked against the field's declared type.
    #[must_use]
    pub fn set(mut self, field: &str, value: impl Into<Value>) -> Self {
        let value = value.into();
        let checked = E::column(field).and_then(|column| {
            column.eq(value.clone())?;
            Ok(column.name())
        });
        match checked {
            Ok(name) => self.values.push((name, value)),
            Err(err) => {
                self.error.get_or_insert(err);
            }
        }
        self
    }

    /// Render `REPLACE INTO` instead of `INSERT INTO`.
    #[must_use]
    pub const fn replace(mut self) -> Self {
        self.replace = true;
        self
    }

    /// Build the statement.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by [`InsertBuilder::set`].
    pub fn build(&self) -> Result<Query> {
        if let Some(err) = &self.error {
            return Err(err.clone());
        }

        let table = &E::schema().table_name;
        let verb = if self.replace { "REPLACE" } else { "INSERT" };

        let query = if self.values.is_empty() {
            Query {
                sql: format!("{verb} INTO \"{table}\" DEFAULT VALUES RETURNING *"),
                params: Vec::new(),
            }
        } else {
            let mut statement = sea_query::Query::insert();
            statement.into_table(Alias::new(table));
            if self.replace {
                statement.replace();
            }

            let columns: Vec<_> = self.values.iter().map(|(column, _)| Alias::new(*column)).collect();
            let row: Vec<SimpleExpr> = self
                .values
                .iter()
                .map(|(_, value)| SimpleExpr::Value(to_sea_value(coerce(value))))
                .collect();

            statement.columns(columns);
            statement.values_panic(row);
            statement.returning_all();

            let (sql, values) = statement.build(QueryBuilder::default());
            let params = values_to_datatypes(values)?;
            Query { sql, params }
        };

        tracing::debug!(
            table = %table,
            sql = %query.sql,
            param_count = query.params.len(),
            "InsertBuilder generated SQL"
        );

        Ok(query)
    }
}
