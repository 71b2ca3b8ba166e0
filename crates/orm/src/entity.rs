use std::fmt::{self, Debug};
use std::marker::PhantomData;

use crate::column::Column;
use crate::error::{Error, Result};
use crate::schema::Schema;
use crate::value::{FieldValue, Value};

/// Declares an entity: a record struct plus its [`Schema`].
///
/// The table name is the struct identifier lower-cased and field order is
/// declaration order. `primary_key` and `foreign_keys` are optional;
/// each foreign key names a field, the referenced entity and its column.
///
/// # Examples
///
/// ```ignore
/// entity! {
///     primary_key = id,
///     #[derive(Debug, Clone, PartialEq)]
///     pub struct Artist {
///         pub id: i64,
///         pub name: String,
///     }
/// }
///
/// entity! {
///     primary_key = id,
///     foreign_keys = [(artist_id, Artist, id)],
///     #[derive(Debug, Clone, PartialEq)]
///     pub struct Album {
///         pub id: i64,
///         pub title: String,
///         pub artist_id: i64,
///     }
/// }
/// ```
#[macro_export]
macro_rules! entity {
    // Single code-generation arm
    (
        @define [$($pk:ident)?]
        [$( ($fk_field:ident, $fk_entity:ident, $fk_column:ident) ),*]
        $(#[$meta:meta])*
        $vis:vis struct $struct_name:ident {
            $(
                $(#[$field_meta:meta])*
                $field_vis:vis $field_name:ident : $field_type:ty
            ),* $(,)?
        }
    ) => {
        #[allow(missing_docs)]
        $(#[$meta])*
        $vis struct $struct_name {
            $(
                $(#[$field_meta])*
                $field_vis $field_name : $field_type
            ),*
        }

        impl $crate::Entity for $struct_name {
            fn schema() -> &'static $crate::Schema {
                static SCHEMA: ::std::sync::LazyLock<$crate::Schema> =
                    ::std::sync::LazyLock::new(|| {
                        $crate::Schema::new(stringify!($struct_name))
                            $( .field($crate::FieldDef::of::<$field_type>(stringify!($field_name))) )*
                            $( .primary_key(stringify!($pk)) )?
                            $( .references(
                                stringify!($fk_field),
                                stringify!($fk_entity),
                                stringify!($fk_column),
                            ) )*
                    });
                &SCHEMA
            }

            fn values(&self) -> Vec<$crate::Value> {
                vec![ $( $crate::FieldValue::to_value(&self.$field_name) ),* ]
            }

            fn apply_row(&mut self, values: Vec<$crate::Value>) -> $crate::Result<()> {
                let fresh = <Self as $crate::FromRow>::from_row(values)?;
                $(
                    if self.$field_name != fresh.$field_name {
                        self.$field_name = fresh.$field_name;
                    }
                )*
                Ok(())
            }
        }

        impl $crate::FromRow for $struct_name {
            fn from_row(values: Vec<$crate::Value>) -> $crate::Result<Self> {
                let schema = <Self as $crate::Entity>::schema();
                schema.check_arity(values.len())?;
                let mut values = values.into_iter();
                Ok(Self {
                    $(
                        $field_name: $crate::__private::decode(
                            schema,
                            stringify!($field_name),
                            values.next(),
                        )?,
                    )*
                })
            }
        }
    };

    // Primary key and foreign keys
    (
        primary_key = $pk:ident,
        foreign_keys = [$( ($fk_field:ident, $fk_entity:ident, $fk_column:ident) ),* $(,)?],
        $($rest:tt)*
    ) => {
        $crate::entity! {
            @define [$pk] [$( ($fk_field, $fk_entity, $fk_column) ),*]
            $($rest)*
        }
    };

    // Primary key only
    (
        primary_key = $pk:ident,
        $($rest:tt)*
    ) => {
        $crate::entity! { @define [$pk] [] $($rest)* }
    };

    // Foreign keys only
    (
        foreign_keys = [$( ($fk_field:ident, $fk_entity:ident, $fk_column:ident) ),* $(,)?],
        $($rest:tt)*
    ) => {
        $crate::entity! {
            @define [] [$( ($fk_field, $fk_entity, $fk_column) ),*]
            $($rest)*
        }
    };

    // Bare struct
    (
        $(#[$meta:meta])*
        $vis:vis struct $($rest:tt)*
    ) => {
        $crate::entity! { @define [] [] $(#[$meta])* $vis struct $($rest)* }
    };
}

/// Conversion of a result row into a value.
///
/// Records are built positionally from rows in schema field order; tuples
/// (`Vec<Value>`) take the row as is.
pub trait FromRow: Sized {
    /// Build `Self` from one row's values.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RowArityMismatch`] if the row does not have one value
    /// per field, or [`Error::Decode`] if a value does not fit its field.
    fn from_row(values: Vec<Value>) -> Result<Self>;
}

impl FromRow for Vec<Value> {
    fn from_row(values: Vec<Value>) -> Result<Self> {
        Ok(values)
    }
}

/// A record type with a [`Schema`].
///
/// Implemented by the [`entity!`](crate::entity) macro.
pub trait Entity: FromRow {
    /// The schema describing this record type.
    fn schema() -> &'static Schema;

    /// The record's field values, in schema field order.
    fn values(&self) -> Vec<Value>;

    /// Apply a row returned by the storage engine onto this record,
    /// overwriting only the fields whose value changed.
    ///
    /// # Errors
    ///
    /// Returns an error if the row cannot be materialized.
    fn apply_row(&mut self, values: Vec<Value>) -> Result<()>;

    /// Selector for whole records of this type.
    #[must_use]
    fn table() -> Table<Self> {
        Table::new()
    }

    /// A column expression for the named field.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownField`] if the field is not declared.
    fn column(name: &str) -> Result<Column> {
        Self::schema().column(name)
    }
}

/// Selects whole records of `E`.
pub struct Table<E>(PhantomData<fn() -> E>);

impl<E> Table<E> {
    /// A selector for `E`.
    #[must_use]
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

impl<E> Default for Table<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for Table<E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> Copy for Table<E> {}

impl<E: Entity> Debug for Table<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Table").field(&E::schema().table_name).finish()
    }
}

/// Decode one positional row value into a field of `schema`.
#[doc(hidden)]
pub fn decode<T: FieldValue>(
    schema: &Schema, field: &'static str, value: Option<Value>,
) -> Result<T> {
    T::from_value(value.unwrap_or(Value::Null)).map_err(|err| Error::Decode {
        table: schema.table_name.clone(),
        field: field.to_string(),
        message: err.to_string(),
    })
}
