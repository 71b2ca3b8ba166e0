//! Boolean (`WHERE`) and assignment (`SET`) clause expressions.
//!
//! Both render to a SQL fragment with positional `?` placeholders and the
//! values bound to them, in placeholder order.

use std::fmt::{self, Display};

use crate::error::{Error, Result};
use crate::value::Value;

/// A rendered clause fragment and its bound values.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Fragment {
    /// SQL text with one `?` per value.
    pub sql: String,

    /// Values bound to the placeholders, left to right.
    pub values: Vec<Value>,
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    /// `=`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

impl Comparison {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }
}

impl Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A boolean expression tree used in `WHERE` clauses.
///
/// Leaves are built from [`Column`](crate::Column) comparisons, which check
/// operand types. Trees are combined with [`Predicate::and`] and
/// [`Predicate::or`].
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `column <op> ?`
    Compare {
        /// Table owning the column.
        table: String,
        /// Column name.
        column: &'static str,
        /// Operator.
        op: Comparison,
        /// Right-hand operand.
        value: Value,
    },
    /// `column IN (?, ...)`
    In {
        /// Table owning the column.
        table: String,
        /// Column name.
        column: &'static str,
        /// Listed operands, never empty.
        values: Vec<Value>,
    },
    /// `(left AND right)`
    And(Box<Self>, Box<Self>),
    /// `(left OR right)`
    Or(Box<Self>, Box<Self>),
}

impl Predicate {
    /// Both predicates must hold.
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        Self::And(Box::new(self), Box::new(other))
    }

    /// Either predicate must hold.
    #[must_use]
    pub fn or(self, other: Self) -> Self {
        Self::Or(Box::new(self), Box::new(other))
    }

    /// Check that every column in the tree belongs to `table`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CrossTableSelection`] naming the first other table.
    pub fn check_table(&self, table: &str) -> Result<()> {
        match self {
            Self::Compare { table: owner, .. } | Self::In { table: owner, .. } => {
                if owner == table {
                    return Ok(());
                }
                Err(Error::CrossTableSelection {
                    expected: table.to_string(),
                    found: owner.clone(),
                })
            }
            Self::And(left, right) | Self::Or(left, right) => {
                left.check_table(table)?;
                right.check_table(table)
            }
        }
    }

    /// Render the predicate, collecting values left then right.
    #[must_use]
    pub fn render(&self) -> Fragment {
        let mut values = Vec::new();
        let sql = self.write(&mut values);
        Fragment { sql, values }
    }

    fn write(&self, values: &mut Vec<Value>) -> String {
        match self {
            Self::Compare { column, op, value, .. } => {
                values.push(value.clone());
                match (op, value.is_null()) {
                    (Comparison::Eq, true) => format!("{column} IS ?"),
                    (Comparison::Ne, true) => format!("{column} IS NOT ?"),
                    _ => format!("{column} {op} ?"),
                }
            }
            Self::In { column, values: operands, .. } => {
                values.extend(operands.iter().cloned());
                let placeholders = vec!["?"; operands.len()].join(", ");
                format!("{column} IN ({placeholders})")
            }
            Self::And(left, right) => {
                let left = left.write(values);
                let right = right.write(values);
                format!("({left} AND {right})")
            }
            Self::Or(left, right) => {
                let left = left.write(values);
                let right = right.write(values);
                format!("({left} OR {right})")
            }
        }
    }
}

/// Arithmetic operators usable in `SET` assignments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arithmetic {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
}

impl Display for Arithmetic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
        })
    }
}

/// One `SET` target of an update: `column = column <op> ?`.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub(crate) table: String,
    pub(crate) column: &'static str,
    pub(crate) op: Arithmetic,
    pub(crate) value: Value,
}

impl Assignment {
    /// Table owning the assigned column.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Render the assignment.
    #[must_use]
    pub fn render(&self) -> Fragment {
        let column = self.column;
        Fragment {
            sql: format!("{column} = {column} {} ?", self.op),
            values: vec![self.value.clone()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compare(column: &'static str, op: Comparison, value: impl Into<Value>) -> Predicate {
        Predicate::Compare {
            table: "a".to_string(),
            column,
            op,
            value: value.into(),
        }
    }

    #[test]
    fn comparison() {
        let fragment = compare("num", Comparison::Ge, 3).render();
        assert_eq!(fragment.sql, "num >= ?");
        assert_eq!(fragment.values, vec![Value::Integer(3)]);
    }

    #[test]
    fn null_comparison_uses_is() {
        assert_eq!(compare("note", Comparison::Eq, Value::Null).render().sql, "note IS ?");
        assert_eq!(compare("note", Comparison::Ne, Value::Null).render().sql, "note IS NOT ?");
    }

    #[test]
    fn in_list() {
        let predicate = Predicate::In {
            table: "a".to_string(),
            column: "id",
            values: vec![Value::Integer(1), Value::Integer(2), Value::Integer(3)],
        };
        let fragment = predicate.render();
        assert_eq!(fragment.sql, "id IN (?, ?, ?)");
        assert_eq!(fragment.values.len(), 3);
    }

    #[test]
    fn nested_combinators_keep_value_order() {
        let predicate = compare("a", Comparison::Eq, 1)
            .and(compare("b", Comparison::Lt, 2))
            .or(compare("c", Comparison::Ne, "x"));
        let fragment = predicate.render();

        assert_eq!(fragment.sql, "((a = ? AND b < ?) OR c != ?)");
        assert_eq!(fragment.values, vec![Value::Integer(1), Value::Integer(2), Value::from("x")]);
    }

    #[test]
    fn table_check_walks_the_tree() {
        let other = Predicate::In {
            table: "b".to_string(),
            column: "id",
            values: vec![Value::Integer(1)],
        };
        let predicate = compare("a", Comparison::Eq, 1).and(compare("b", Comparison::Lt, 2));
        predicate.check_table("a").unwrap();

        let mixed = predicate.or(other);
        assert!(matches!(
            mixed.check_table("a"),
            Err(Error::CrossTableSelection { ref found, .. }) if found == "b"
        ));
    }

    #[test]
    fn assignment() {
        let assignment = Assignment {
            table: "a".to_string(),
            column: "num",
            op: Arithmetic::Mul,
            value: Value::Integer(2),
        };
        let fragment = assignment.render();
        assert_eq!(fragment.sql, "num = num * ?");
        assert_eq!(fragment.values, vec![Value::Integer(2)]);
    }
}
