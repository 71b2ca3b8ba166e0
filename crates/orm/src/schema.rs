//! Record schemas and their table DDL.

use keel_sql::Connection;
use sea_query::{Alias, ColumnDef, ForeignKey, SchemaStatementBuilder, SqliteQueryBuilder};
use tracing::instrument;

use crate::column::Column;
use crate::error::{Error, Result};
use crate::value::{FieldKind, FieldValue};

/// A declared field of a [`Schema`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    /// Field (and storage column) name.
    pub name: &'static str,

    /// Semantic type.
    pub kind: FieldKind,

    /// Whether the field accepts `NULL`.
    pub nullable: bool,

    /// Whether the field is the table's primary key.
    pub primary_key: bool,
}

impl FieldDef {
    /// A non-nullable field of the given kind.
    #[must_use]
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            nullable: false,
            primary_key: false,
        }
    }

    /// A field whose kind and nullability follow the host type `T`.
    #[must_use]
    pub const fn of<T: FieldValue>(name: &'static str) -> Self {
        Self {
            name,
            kind: T::KIND,
            nullable: T::NULLABLE,
            primary_key: false,
        }
    }

    /// Mark the field as the primary key.
    #[must_use]
    pub const fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Allow `NULL` values.
    #[must_use]
    pub const fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }
}

/// A reference from one of a schema's fields to a column of another table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyDef {
    /// Referencing field on this schema.
    pub field: &'static str,

    /// Referenced table.
    pub table: String,

    /// Referenced column.
    pub column: &'static str,
}

/// The storage shape of a record type.
///
/// Field order is load-bearing: it is the column order of the table, of
/// insert statements and of the rows materialized back into records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    /// Identifier the schema was declared with.
    pub name: &'static str,

    /// Table name, the lower-cased identifier.
    pub table_name: String,

    /// Declared fields, in declaration order.
    pub fields: Vec<FieldDef>,

    /// Declared foreign keys.
    pub foreign_keys: Vec<ForeignKeyDef>,
}

impl Schema {
    /// Declare an empty schema. No storage is touched.
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            table_name: name.to_lowercase(),
            fields: Vec::new(),
            foreign_keys: Vec::new(),
        }
    }

    /// Append a field.
    #[must_use]
    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    /// Mark the named field as the primary key. Unknown names are ignored.
    #[must_use]
    pub fn primary_key(mut self, name: &str) -> Self {
        if let Some(field) = self.fields.iter_mut().find(|field| field.name == name) {
            field.primary_key = true;
        }
        self
    }

    /// Declare that `field` references `column` of the table for the record
    /// type named `entity`.
    #[must_use]
    pub fn references(mut self, field: &'static str, entity: &str, column: &'static str) -> Self {
        self.foreign_keys.push(ForeignKeyDef {
            field,
            table: entity.to_lowercase(),
            column,
        });
        self
    }

    /// A column expression for the named field.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownField`] if the field is not declared.
    pub fn column(&self, name: &str) -> Result<Column> {
        self.fields
            .iter()
            .find(|field| field.name == name)
            .map(|field| Column::new(&self.table_name, field))
            .ok_or_else(|| Error::UnknownField {
                table: self.table_name.clone(),
                field: name.to_string(),
            })
    }

    /// Column expressions for every field, in declaration order.
    #[must_use]
    pub fn columns(&self) -> Vec<Column> {
        self.fields.iter().map(|field| Column::new(&self.table_name, field)).collect()
    }

    /// Check that a row has exactly one value per field.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RowArityMismatch`] otherwise.
    pub fn check_arity(&self, actual: usize) -> Result<()> {
        if actual == self.fields.len() {
            return Ok(());
        }
        Err(Error::RowArityMismatch {
            table: self.table_name.clone(),
            expected: self.fields.len(),
            actual,
        })
    }

    /// The `CREATE TABLE` statement for this schema.
    ///
    /// Each field becomes `<name> <affinity> [PRIMARY KEY]`, followed by one
    /// `FOREIGN KEY (...) REFERENCES ...` constraint per declared reference.
    /// Primary keys are not validated here: zero or several are passed
    /// through to the storage engine.
    #[must_use]
    pub fn create_statement(&self) -> String {
        let mut table = sea_query::Table::create();
        table.table(Alias::new(&self.table_name));

        for field in &self.fields {
            let mut column = ColumnDef::new(Alias::new(field.name));
            column.custom(Alias::new(field.kind.affinity().as_str()));
            if field.primary_key {
                column.primary_key();
            }
            table.col(&mut column);
        }

        for reference in &self.foreign_keys {
            table.foreign_key(
                ForeignKey::create()
                    .from(Alias::new(&self.table_name), Alias::new(reference.field))
                    .to(Alias::new(&reference.table), Alias::new(reference.column)),
            );
        }

        table.to_string(SqliteQueryBuilder)
    }

    /// Whether the storage engine's catalog has a table with this name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the catalog cannot be read.
    pub fn exists(&self, conn: &dyn Connection) -> Result<bool> {
        Ok(conn.table_exists(&self.table_name)?)
    }

    /// Create the backing table.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the storage engine rejects the DDL.
    #[instrument(skip_all, fields(table = %self.table_name))]
    pub fn create(&self, conn: &dyn Connection) -> Result<()> {
        let sql = self.create_statement();
        tracing::debug!(sql = %sql, "creating table");
        conn.exec(&sql, &[])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Schema {
        Schema::new("Track")
            .field(FieldDef::new("id", FieldKind::Integer).primary_key())
            .field(FieldDef::new("title", FieldKind::Text))
            .field(FieldDef::of::<Option<f64>>("rating"))
            .field(FieldDef::new("album_id", FieldKind::Integer))
            .references("album_id", "Album", "id")
    }

    #[test]
    fn table_name_is_lowercased() {
        assert_eq!(sample().table_name, "track");
    }

    #[test]
    fn create_statement_lists_fields_in_order() {
        let sql = sample().create_statement().replace('"', "");
        assert!(sql.starts_with("CREATE TABLE track ("), "{sql}");

        let id = sql.find("id INTEGER PRIMARY KEY").expect("id column");
        let title = sql.find("title TEXT").expect("title column");
        let rating = sql.find("rating REAL").expect("rating column");
        assert!(id < title && title < rating);
        assert!(sql.contains("FOREIGN KEY (album_id) REFERENCES album (id)"), "{sql}");
    }

    #[test]
    fn unknown_column() {
        let err = sample().column("missing").unwrap_err();
        assert!(matches!(err, Error::UnknownField { ref field, .. } if field == "missing"));
    }

    #[test]
    fn nullable_fields_follow_host_type() {
        let schema = sample();
        assert!(schema.fields[2].nullable);
        assert!(!schema.fields[1].nullable);
    }

    #[test]
    fn arity() {
        let schema = sample();
        schema.check_arity(4).unwrap();
        assert!(matches!(
            schema.check_arity(3),
            Err(Error::RowArityMismatch { expected: 4, actual: 3, .. })
        ));
    }
}
