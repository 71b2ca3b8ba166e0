//! Conversion between host values and the storage engine's native types.
//!
//! Values keep their full host type while clauses are built so operands can be
//! checked against column declarations. They are coerced to a storage-native
//! [`DataType`] only when a rendered statement binds its parameters.

use std::fmt::{self, Display};

use anyhow::{Result, anyhow, bail};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use keel_sql::DataType;

/// Semantic type of a schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// Signed integer.
    Integer,
    /// Floating point number.
    Real,
    /// UTF-8 text.
    Text,
    /// Boolean, stored as `0`/`1`.
    Boolean,
    /// Raw bytes.
    Bytes,
    /// UTC timestamp, stored as RFC 3339 text.
    Timestamp,
    /// Calendar date, stored as `%Y-%m-%d` text.
    Date,
    /// JSON document, stored as JSON text.
    Json,
}

impl FieldKind {
    /// The storage column affinity used for this kind.
    ///
    /// Kinds with no native storage class are opaque and use `BLOB`
    /// affinity, which stores their textual form verbatim.
    #[must_use]
    pub const fn affinity(self) -> Affinity {
        match self {
            Self::Integer | Self::Boolean => Affinity::Integer,
            Self::Real => Affinity::Real,
            Self::Text => Affinity::Text,
            Self::Bytes | Self::Timestamp | Self::Date | Self::Json => Affinity::Blob,
        }
    }

    const fn name(self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::Real => "real",
            Self::Text => "text",
            Self::Boolean => "boolean",
            Self::Bytes => "bytes",
            Self::Timestamp => "timestamp",
            Self::Date => "date",
            Self::Json => "json",
        }
    }
}

impl Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Storage column affinity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Affinity {
    /// `INTEGER`
    Integer,
    /// `TEXT`
    Text,
    /// `REAL`
    Real,
    /// `BLOB`
    Blob,
}

impl Affinity {
    /// The affinity's name as written in DDL.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Integer => "INTEGER",
            Self::Text => "TEXT",
            Self::Real => "REAL",
            Self::Blob => "BLOB",
        }
    }
}

/// A host value used as a clause operand, a record field or a tuple element.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// SQL `NULL`.
    Null,
    /// Signed integer.
    Integer(i64),
    /// Floating point number.
    Real(f64),
    /// UTF-8 text.
    Text(String),
    /// Boolean.
    Boolean(bool),
    /// Raw bytes.
    Bytes(Vec<u8>),
    /// UTC timestamp.
    Timestamp(DateTime<Utc>),
    /// Calendar date.
    Date(NaiveDate),
    /// JSON document.
    Json(serde_json::Value),
}

impl Value {
    /// The field kind this value satisfies, or `None` for `NULL`.
    #[must_use]
    pub const fn kind(&self) -> Option<FieldKind> {
        match self {
            Self::Null => None,
            Self::Integer(_) => Some(FieldKind::Integer),
            Self::Real(_) => Some(FieldKind::Real),
            Self::Text(_) => Some(FieldKind::Text),
            Self::Boolean(_) => Some(FieldKind::Boolean),
            Self::Bytes(_) => Some(FieldKind::Bytes),
            Self::Timestamp(_) => Some(FieldKind::Timestamp),
            Self::Date(_) => Some(FieldKind::Date),
            Self::Json(_) => Some(FieldKind::Json),
        }
    }

    /// Returns `true` for [`Value::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Name of the value's type, used in error messages.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self.kind() {
            Some(kind) => kind.name(),
            None => "null",
        }
    }

    /// Whether the value is null or its type's zero value.
    ///
    /// Primary keys holding an unset value are left for the storage engine
    /// to assign.
    #[must_use]
    pub fn is_unset(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Integer(v) => *v == 0,
            Self::Real(v) => v.abs() < f64::EPSILON,
            Self::Text(v) => v.is_empty(),
            Self::Boolean(v) => !v,
            Self::Bytes(v) => v.is_empty(),
            Self::Json(v) => v.is_null(),
            Self::Timestamp(_) | Self::Date(_) => false,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Integer(v) => write!(f, "{v}"),
            Self::Real(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
            Self::Boolean(v) => write!(f, "{v}"),
            Self::Bytes(v) => write!(f, "<{} bytes>", v.len()),
            Self::Timestamp(v) => f.write_str(&v.to_rfc3339()),
            Self::Date(v) => write!(f, "{}", v.format("%Y-%m-%d")),
            Self::Json(v) => write!(f, "{v}"),
        }
    }
}

/// Coerce a value into the storage-native type bound into a statement.
///
/// Null, integers, reals, text and bytes pass through unchanged, booleans
/// become `0`/`1`, and everything else is bound as its textual form.
#[must_use]
pub fn coerce(value: &Value) -> DataType {
    match value {
        Value::Null => DataType::Null,
        Value::Integer(v) => DataType::Integer(*v),
        Value::Real(v) => DataType::Real(*v),
        Value::Text(v) => DataType::Text(v.clone()),
        Value::Boolean(v) => DataType::Integer(i64::from(*v)),
        Value::Bytes(v) => DataType::Blob(v.clone()),
        Value::Timestamp(_) | Value::Date(_) | Value::Json(_) => DataType::Text(value.to_string()),
    }
}

impl From<DataType> for Value {
    fn from(value: DataType) -> Self {
        match value {
            DataType::Null => Self::Null,
            DataType::Integer(v) => Self::Integer(v),
            DataType::Real(v) => Self::Real(v),
            DataType::Text(v) => Self::Text(v),
            DataType::Blob(v) => Self::Bytes(v),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Timestamp(value)
    }
}

impl From<NaiveDate> for Value {
    fn from(value: NaiveDate) -> Self {
        Self::Date(value)
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        Self::Json(value)
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Host types usable as record fields.
///
/// Implemented for `i64`, `i32`, `f64`, `bool`, `String`, `Vec<u8>`,
/// `DateTime<Utc>`, `NaiveDate`, `serde_json::Value` and `Option` of any of
/// these.
pub trait FieldValue: Sized {
    /// Declared kind of fields of this type.
    const KIND: FieldKind;

    /// Whether fields of this type accept `NULL`.
    const NULLABLE: bool = false;

    /// Convert the field into a clause or insert value.
    fn to_value(&self) -> Value;

    /// Convert a value read back from storage into the field type.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored value cannot represent this type.
    fn from_value(value: Value) -> Result<Self>;
}

impl FieldValue for i64 {
    const KIND: FieldKind = FieldKind::Integer;

    fn to_value(&self) -> Value {
        Value::Integer(*self)
    }

    fn from_value(value: Value) -> Result<Self> {
        as_i64(&value)
    }
}

impl FieldValue for i32 {
    const KIND: FieldKind = FieldKind::Integer;

    fn to_value(&self) -> Value {
        Value::Integer(i64::from(*self))
    }

    fn from_value(value: Value) -> Result<Self> {
        let v = as_i64(&value)?;
        Self::try_from(v).map_err(|_e| anyhow!("integer {v} out of range for i32"))
    }
}

impl FieldValue for f64 {
    const KIND: FieldKind = FieldKind::Real;

    fn to_value(&self) -> Value {
        Value::Real(*self)
    }

    fn from_value(value: Value) -> Result<Self> {
        as_f64(&value)
    }
}

impl FieldValue for bool {
    const KIND: FieldKind = FieldKind::Boolean;

    fn to_value(&self) -> Value {
        Value::Boolean(*self)
    }

    fn from_value(value: Value) -> Result<Self> {
        as_bool(&value)
    }
}

impl FieldValue for String {
    const KIND: FieldKind = FieldKind::Text;

    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Text(v) => Ok(v),
            other => bail!("expected text, found {}", other.type_name()),
        }
    }
}

impl FieldValue for Vec<u8> {
    const KIND: FieldKind = FieldKind::Bytes;

    fn to_value(&self) -> Value {
        Value::Bytes(self.clone())
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Bytes(v) => Ok(v),
            Value::Text(v) => Ok(v.into_bytes()),
            other => bail!("expected bytes, found {}", other.type_name()),
        }
    }
}

impl FieldValue for DateTime<Utc> {
    const KIND: FieldKind = FieldKind::Timestamp;

    fn to_value(&self) -> Value {
        Value::Timestamp(*self)
    }

    fn from_value(value: Value) -> Result<Self> {
        as_timestamp(&value)
    }
}

impl FieldValue for NaiveDate {
    const KIND: FieldKind = FieldKind::Date;

    fn to_value(&self) -> Value {
        Value::Date(*self)
    }

    fn from_value(value: Value) -> Result<Self> {
        as_date(&value)
    }
}

impl FieldValue for serde_json::Value {
    const KIND: FieldKind = FieldKind::Json;

    fn to_value(&self) -> Value {
        Value::Json(self.clone())
    }

    fn from_value(value: Value) -> Result<Self> {
        as_json(value)
    }
}

impl<T: FieldValue> FieldValue for Option<T> {
    const KIND: FieldKind = T::KIND;
    const NULLABLE: bool = true;

    fn to_value(&self) -> Value {
        self.as_ref().map_or(Value::Null, T::to_value)
    }

    fn from_value(value: Value) -> Result<Self> {
        if value.is_null() { Ok(None) } else { T::from_value(value).map(Some) }
    }
}

fn as_i64(value: &Value) -> Result<i64> {
    match value {
        Value::Integer(v) => Ok(*v),
        other => bail!("expected integer, found {}", other.type_name()),
    }
}

#[allow(clippy::cast_precision_loss)]
fn as_f64(value: &Value) -> Result<f64> {
    match value {
        Value::Real(v) => Ok(*v),
        // REAL columns hand back integral values stored without a fraction
        Value::Integer(v) => Ok(*v as f64),
        other => bail!("expected real, found {}", other.type_name()),
    }
}

fn as_bool(value: &Value) -> Result<bool> {
    match value {
        Value::Boolean(v) => Ok(*v),
        Value::Integer(0) => Ok(false),
        Value::Integer(1) => Ok(true),
        Value::Integer(v) => bail!("integer {v} is not a boolean"),
        other => bail!("expected boolean, found {}", other.type_name()),
    }
}

fn as_timestamp(value: &Value) -> Result<DateTime<Utc>> {
    match value {
        Value::Timestamp(v) => Ok(*v),
        Value::Text(raw) => {
            if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
                return Ok(parsed.with_timezone(&Utc));
            }

            if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f") {
                return Ok(DateTime::<Utc>::from_naive_utc_and_offset(parsed, Utc));
            }

            bail!(
                "unsupported timestamp: {raw}; expected RFC3339 or \"%Y-%m-%d %H:%M:%S%.f\" format"
            )
        }
        other => bail!("expected timestamp, found {}", other.type_name()),
    }
}

fn as_date(value: &Value) -> Result<NaiveDate> {
    match value {
        Value::Date(v) => Ok(*v),
        Value::Text(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map_err(|_e| anyhow!("unsupported date: {raw}; expected \"%Y-%m-%d\" format")),
        other => bail!("expected date, found {}", other.type_name()),
    }
}

fn as_json(value: Value) -> Result<serde_json::Value> {
    match value {
        Value::Json(v) => Ok(v),
        Value::Text(raw) => Ok(serde_json::from_str(&raw)?),
        Value::Bytes(bytes) => Ok(serde_json::from_slice(&bytes)?),
        other => bail!("expected json compatible value, found {}", other.type_name()),
    }
}
