use std::fmt::{self, Display};

use crate::entity::{Entity, Table};
use crate::error::{Error, Result};
use crate::filter::{Arithmetic, Assignment, Comparison, Predicate};
use crate::schema::{FieldDef, Schema};
use crate::value::{FieldKind, Value};

/// Aggregate functions that can be applied to a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    /// `COUNT`
    Count,
    /// `SUM`
    Sum,
    /// `AVG`
    Avg,
    /// `MIN`
    Min,
    /// `MAX`
    Max,
}

impl Display for Aggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Count => "COUNT",
            Self::Sum => "SUM",
            Self::Avg => "AVG",
            Self::Min => "MIN",
            Self::Max => "MAX",
        })
    }
}

/// A typed reference to one field of a schema.
///
/// Obtained from [`Schema::column`] or [`Entity::column`]. Comparison and
/// arithmetic methods check their operand against the declared type before
/// any SQL is built.
///
/// Attaching an aggregate is terminal: an aggregated column can be selected,
/// ordered by or grouped by, but not compared, assigned or aggregated again.
#[derive(Debug, Clone)]
pub struct Column {
    table: String,
    name: &'static str,
    kind: FieldKind,
    nullable: bool,
    aggregate: Option<Aggregate>,
    nested: Option<Aggregate>,
}

impl Column {
    pub(crate) fn new(table: &str, field: &FieldDef) -> Self {
        Self {
            table: table.to_string(),
            name: field.name,
            kind: field.kind,
            nullable: field.nullable,
            aggregate: None,
            nested: None,
        }
    }

    /// Field name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Table owning the field.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Declared type.
    #[must_use]
    pub const fn kind(&self) -> FieldKind {
        self.kind
    }

    /// Attached aggregate function, if any.
    #[must_use]
    pub const fn aggregate(&self) -> Option<Aggregate> {
        self.aggregate
    }

    /// The column as written in a select list: `name` or `FUNC(name)`.
    #[must_use]
    pub fn render(&self) -> String {
        self.aggregate
            .map_or_else(|| self.name.to_string(), |func| format!("{func}({})", self.name))
    }

    /// `column = value`
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeMismatch`] if `value` does not match the declared
    /// type, or [`Error::AggregatedOperand`] on an aggregated column.
    pub fn eq(&self, value: impl Into<Value>) -> Result<Predicate> {
        self.compare(Comparison::Eq, value.into())
    }

    /// `column != value`
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeMismatch`] if `value` does not match the declared
    /// type, or [`Error::AggregatedOperand`] on an aggregated column.
    pub fn ne(&self, value: impl Into<Value>) -> Result<Predicate> {
        self.compare(Comparison::Ne, value.into())
    }

    /// `column < value`
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeMismatch`] if `value` does not match the declared
    /// type, or [`Error::AggregatedOperand`] on an aggregated column.
    pub fn lt(&self, value: impl Into<Value>) -> Result<Predicate> {
        self.compare(Comparison::Lt, value.into())
    }

    /// `column <= value`
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeMismatch`] if `value` does not match the declared
    /// type, or [`Error::AggregatedOperand`] on an aggregated column.
    pub fn le(&self, value: impl Into<Value>) -> Result<Predicate> {
        self.compare(Comparison::Le, value.into())
    }

    /// `column > value`
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeMismatch`] if `value` does not match the declared
    /// type, or [`Error::AggregatedOperand`] on an aggregated column.
    pub fn gt(&self, value: impl Into<Value>) -> Result<Predicate> {
        self.compare(Comparison::Gt, value.into())
    }

    /// `column >= value`
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeMismatch`] if `value` does not match the declared
    /// type, or [`Error::AggregatedOperand`] on an aggregated column.
    pub fn ge(&self, value: impl Into<Value>) -> Result<Predicate> {
        self.compare(Comparison::Ge, value.into())
    }

    /// `column IN (values...)`
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyOperand`] for an empty list,
    /// [`Error::TypeMismatch`] if any element does not match the declared type
    /// and [`Error::AggregatedOperand`] on an aggregated column.
    pub fn in_list<V: Into<Value>>(&self, values: impl IntoIterator<Item = V>) -> Result<Predicate> {
        self.plain()?;
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        if values.is_empty() {
            return Err(Error::EmptyOperand {
                table: self.table.clone(),
                field: self.name.to_string(),
            });
        }
        for value in &values {
            self.check(value)?;
        }
        Ok(Predicate::In {
            table: self.table.clone(),
            column: self.name,
            values,
        })
    }

    /// `SET column = column + value`
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeMismatch`] if `value` does not match the declared
    /// type, or [`Error::AggregatedOperand`] on an aggregated column.
    pub fn add(&self, value: impl Into<Value>) -> Result<Assignment> {
        self.assign(Arithmetic::Add, value.into())
    }

    /// `SET column = column - value`
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeMismatch`] if `value` does not match the declared
    /// type, or [`Error::AggregatedOperand`] on an aggregated column.
    pub fn sub(&self, value: impl Into<Value>) -> Result<Assignment> {
        self.assign(Arithmetic::Sub, value.into())
    }

    /// `SET column = column * value`
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeMismatch`] if `value` does not match the declared
    /// type, or [`Error::AggregatedOperand`] on an aggregated column.
    pub fn mul(&self, value: impl Into<Value>) -> Result<Assignment> {
        self.assign(Arithmetic::Mul, value.into())
    }

    /// `SET column = column / value`
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeMismatch`] if `value` does not match the declared
    /// type, or [`Error::AggregatedOperand`] on an aggregated column.
    pub fn div(&self, value: impl Into<Value>) -> Result<Assignment> {
        self.assign(Arithmetic::Div, value.into())
    }

    /// Select `COUNT(column)`.
    #[must_use]
    pub fn count(self) -> Self {
        self.with_aggregate(Aggregate::Count)
    }

    /// Select `SUM(column)`.
    #[must_use]
    pub fn sum(self) -> Self {
        self.with_aggregate(Aggregate::Sum)
    }

    /// Select `AVG(column)`.
    #[must_use]
    pub fn avg(self) -> Self {
        self.with_aggregate(Aggregate::Avg)
    }

    /// Select `MIN(column)`.
    #[must_use]
    pub fn min(self) -> Self {
        self.with_aggregate(Aggregate::Min)
    }

    /// Select `MAX(column)`.
    #[must_use]
    pub fn max(self) -> Self {
        self.with_aggregate(Aggregate::Max)
    }

    /// Check the column is usable in a select list, ORDER BY or GROUP BY.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NestedAggregate`] if a second aggregate was applied.
    pub fn validate(&self) -> Result<()> {
        match (self.aggregate, self.nested) {
            (Some(inner), Some(outer)) => Err(Error::NestedAggregate {
                table: self.table.clone(),
                field: self.name.to_string(),
                inner,
                outer,
            }),
            _ => Ok(()),
        }
    }

    // A second aggregate is kept aside and reported when the column is used.
    fn with_aggregate(mut self, aggregate: Aggregate) -> Self {
        if self.aggregate.is_some() {
            self.nested.get_or_insert(aggregate);
        } else {
            self.aggregate = Some(aggregate);
        }
        self
    }

    fn plain(&self) -> Result<()> {
        match self.aggregate {
            Some(aggregate) => Err(Error::AggregatedOperand {
                table: self.table.clone(),
                field: self.name.to_string(),
                aggregate,
            }),
            None => Ok(()),
        }
    }

    fn compare(&self, op: Comparison, value: Value) -> Result<Predicate> {
        self.plain()?;
        self.check(&value)?;
        Ok(Predicate::Compare {
            table: self.table.clone(),
            column: self.name,
            op,
            value,
        })
    }

    fn assign(&self, op: Arithmetic, value: Value) -> Result<Assignment> {
        self.plain()?;
        self.check(&value)?;
        Ok(Assignment {
            table: self.table.clone(),
            column: self.name,
            op,
            value,
        })
    }

    fn check(&self, value: &Value) -> Result<()> {
        let accepted = match value.kind() {
            Some(kind) => kind == self.kind,
            None => self.nullable,
        };
        if accepted {
            return Ok(());
        }
        Err(Error::TypeMismatch {
            table: self.table.clone(),
            field: self.name.to_string(),
            expected: self.kind,
            found: value.type_name(),
        })
    }
}

/// Every column in `columns` must belong to `table`.
pub(crate) fn check_same_table(table: &str, columns: &[Column]) -> Result<()> {
    match columns.iter().find(|column| column.table != table) {
        Some(column) => Err(Error::CrossTableSelection {
            expected: table.to_string(),
            found: column.table.clone(),
        }),
        None => Ok(()),
    }
}

/// What a query or delete targets: a whole table or a column projection.
#[derive(Debug, Clone)]
pub enum Selection {
    /// Every field of a schema, materialized into records.
    Table(&'static Schema),
    /// A projection, materialized into tuples.
    Columns(Vec<Column>),
}

/// Arguments accepted by [`Engine::query`](crate::Engine::query) and
/// [`Engine::delete`](crate::Engine::delete).
pub trait Selectable {
    /// Row type produced by the statement.
    type Output;

    /// The selection this argument describes.
    fn into_selection(self) -> Selection;
}

impl<E: Entity> Selectable for Table<E> {
    type Output = E;

    fn into_selection(self) -> Selection {
        Selection::Table(E::schema())
    }
}

impl Selectable for Column {
    type Output = Vec<Value>;

    fn into_selection(self) -> Selection {
        Selection::Columns(vec![self])
    }
}

impl Selectable for Vec<Column> {
    type Output = Vec<Value>;

    fn into_selection(self) -> Selection {
        Selection::Columns(self)
    }
}

impl<const N: usize> Selectable for [Column; N] {
    type Output = Vec<Value>;

    fn into_selection(self) -> Selection {
        Selection::Columns(self.into())
    }
}

/// Column lists accepted by `order_by`, `group_by` and `returning`.
pub trait IntoColumns {
    /// The listed columns, in order.
    fn into_columns(self) -> Vec<Column>;
}

impl IntoColumns for Column {
    fn into_columns(self) -> Vec<Column> {
        vec![self]
    }
}

impl IntoColumns for Vec<Column> {
    fn into_columns(self) -> Vec<Column> {
        self
    }
}

impl<const N: usize> IntoColumns for [Column; N] {
    fn into_columns(self) -> Vec<Column> {
        self.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Schema {
        Schema::new("A")
            .field(FieldDef::new("id", FieldKind::Integer).primary_key())
            .field(FieldDef::new("num", FieldKind::Integer))
            .field(FieldDef::new("string", FieldKind::Text))
            .field(FieldDef::new("note", FieldKind::Text).nullable())
    }

    #[test]
    fn comparisons_are_type_checked() {
        let num = schema().column("num").unwrap();
        num.eq(5).unwrap();
        num.ge(5_i32).unwrap();

        let err = num.eq("not an int").unwrap_err();
        assert!(matches!(
            err,
            Error::TypeMismatch {
                expected: FieldKind::Integer,
                found: "text",
                ..
            }
        ));
        num.lt(1.5).unwrap_err();
    }

    #[test]
    fn null_only_for_nullable_fields() {
        let schema = schema();
        schema.column("note").unwrap().eq(Value::Null).unwrap();
        schema.column("note").unwrap().ne(None::<String>).unwrap();
        schema.column("string").unwrap().eq(Value::Null).unwrap_err();
    }

    #[test]
    fn in_list_checks_every_element() {
        let id = schema().column("id").unwrap();
        let fragment = id.in_list([1, 2, 3]).unwrap().render();
        assert_eq!(fragment.sql, "id IN (?, ?, ?)");

        assert!(matches!(id.in_list(Vec::<i64>::new()), Err(Error::EmptyOperand { .. })));
        let mixed = vec![Value::Integer(1), Value::from("2")];
        assert!(matches!(id.in_list(mixed), Err(Error::TypeMismatch { .. })));
    }

    #[test]
    fn arithmetic_assignments() {
        let num = schema().column("num").unwrap();
        let fragment = num.add(1).unwrap().render();
        assert_eq!(fragment.sql, "num = num + ?");
        assert_eq!(fragment.values, vec![Value::Integer(1)]);

        assert_eq!(num.sub(2).unwrap().render().sql, "num = num - ?");
        assert_eq!(num.div(2).unwrap().render().sql, "num = num / ?");
        num.mul("x").unwrap_err();
    }

    #[test]
    fn aggregates_render_as_functions() {
        let num = schema().column("num").unwrap();
        assert_eq!(num.render(), "num");
        assert_eq!(num.clone().sum().render(), "SUM(num)");
        assert_eq!(num.clone().avg().render(), "AVG(num)");
        assert_eq!(num.count().aggregate(), Some(Aggregate::Count));
    }

    #[test]
    fn aggregated_columns_are_terminal() {
        let num = schema().column("num").unwrap();
        assert!(matches!(
            num.clone().sum().gt(3),
            Err(Error::AggregatedOperand { aggregate: Aggregate::Sum, .. })
        ));
        assert!(matches!(num.clone().max().add(1), Err(Error::AggregatedOperand { .. })));
        assert!(matches!(num.clone().min().in_list([1]), Err(Error::AggregatedOperand { .. })));

        let nested = num.count().sum();
        assert_eq!(nested.aggregate(), Some(Aggregate::Count));
        assert!(matches!(
            nested.validate(),
            Err(Error::NestedAggregate {
                inner: Aggregate::Count,
                outer: Aggregate::Sum,
                ..
            })
        ));
    }

    #[test]
    fn same_table_check() {
        let columns = schema().columns();
        check_same_table("a", &columns).unwrap();

        let other = Schema::new("B").field(FieldDef::new("id", FieldKind::Integer));
        let mixed = vec![columns[0].clone(), other.column("id").unwrap()];
        assert!(matches!(
            check_same_table("a", &mixed),
            Err(Error::CrossTableSelection { ref found, .. }) if found == "b"
        ));
    }
}
