use std::fmt::{self, Debug, Display};

use anyhow::Result;

/// A value in one of the storage engine's native storage classes.
#[derive(Debug, Clone, PartialEq)]
pub enum DataType {
    /// SQL `NULL`.
    Null,
    /// A signed 64-bit integer.
    Integer(i64),
    /// An 8-byte IEEE floating point number.
    Real(f64),
    /// UTF-8 text.
    Text(String),
    /// Raw bytes, stored exactly as given.
    Blob(Vec<u8>),
}

impl DataType {
    /// Returns `true` for [`DataType::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Integer(v) => write!(f, "{v}"),
            Self::Real(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "{v}"),
            Self::Blob(v) => write!(f, "<{} bytes>", v.len()),
        }
    }
}

/// A named column value in a result row.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// Column name as reported by the storage engine.
    pub name: String,

    /// Column value.
    pub value: DataType,
}

/// A single result row. Fields are in result-column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    /// Row fields, in result-column order.
    pub fields: Vec<Field>,
}

impl Row {
    /// Number of columns in the row.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if the row has no columns.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Consumes the row, returning its values in column order.
    #[must_use]
    pub fn into_values(self) -> Vec<DataType> {
        self.fields.into_iter().map(|field| field.value).collect()
    }
}

/// Storage backends implement [`Connection`] so the ORM can execute
/// parameterized SQL against them.
///
/// Placeholders are positional `?` markers bound strictly left to right from
/// `params`. Implementations are not expected to be shared between threads;
/// use one connection per worker or wrap it in external mutual exclusion.
pub trait Connection: Debug + Send + 'static {
    /// Execute a statement and return every resulting row.
    ///
    /// # Errors
    ///
    /// Returns the storage engine's own error if the statement fails.
    fn query(&self, sql: &str, params: &[DataType]) -> Result<Vec<Row>>;

    /// Execute a statement that returns no rows (for example DDL), returning
    /// the number of affected rows.
    ///
    /// # Errors
    ///
    /// Returns the storage engine's own error if the statement fails.
    fn exec(&self, sql: &str, params: &[DataType]) -> Result<u64>;

    /// Commit any open transaction.
    ///
    /// # Errors
    ///
    /// Returns the storage engine's own error if the commit fails.
    fn commit(&self) -> Result<()>;

    /// Check the storage engine's catalog for a table with the given name.
    ///
    /// # Errors
    ///
    /// Returns the storage engine's own error if the catalog cannot be read.
    fn table_exists(&self, name: &str) -> Result<bool>;
}
