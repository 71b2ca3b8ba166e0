//! Clause-slot accumulation and rendering shared by every statement builder.
//!
//! A statement collects at most one fragment per [`Clause`]. Rendering
//! validates the collected slots, orders them by the statement kind's fixed
//! clause order (never by insertion order), joins the fragments with single
//! spaces and coerces the bound values.

use std::fmt::{self, Display};

use crate::error::{Error, Result};
use crate::filter::Predicate;
use crate::query::Query;
use crate::value::{Value, coerce};

/// Clause kinds a statement slot can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Clause {
    /// `SELECT ...`
    Select,
    /// `FROM ...`
    From,
    /// `DELETE FROM ...`
    Delete,
    /// `UPDATE ...`
    Update,
    /// `SET ...`
    Set,
    /// `WHERE ...`
    Where,
    /// `GROUP BY ...`
    GroupBy,
    /// `ORDER BY ...`
    OrderBy,
    /// `LIMIT ?`
    Limit,
    /// `OFFSET ?`
    Offset,
    /// `RETURNING ...`
    Returning,
}

impl Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Select => "SELECT",
            Self::From => "FROM",
            Self::Delete => "DELETE",
            Self::Update => "UPDATE",
            Self::Set => "SET",
            Self::Where => "WHERE",
            Self::GroupBy => "GROUP BY",
            Self::OrderBy => "ORDER BY",
            Self::Limit => "LIMIT",
            Self::Offset => "OFFSET",
            Self::Returning => "RETURNING",
        })
    }
}

/// The kinds of statement the builders produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    /// A read statement.
    Select,
    /// An update statement.
    Update,
    /// A delete statement.
    Delete,
}

impl StatementKind {
    /// Clauses accepted by this kind, in rendering order.
    #[must_use]
    pub const fn clauses(self) -> &'static [Clause] {
        match self {
            Self::Select => &[
                Clause::Select,
                Clause::From,
                Clause::Where,
                Clause::GroupBy,
                Clause::OrderBy,
                Clause::Limit,
                Clause::Offset,
            ],
            Self::Delete => &[Clause::Delete, Clause::Where, Clause::Returning],
            Self::Update => &[
                Clause::Update,
                Clause::Set,
                Clause::From,
                Clause::Where,
                Clause::Returning,
                Clause::OrderBy,
                Clause::Limit,
                Clause::Offset,
            ],
        }
    }

    /// Clauses that must be present when the statement is rendered.
    #[must_use]
    pub const fn mandatory(self) -> &'static [Clause] {
        match self {
            Self::Select => &[Clause::Select, Clause::From],
            Self::Delete => &[Clause::Delete],
            Self::Update => &[Clause::Update, Clause::Set],
        }
    }

    fn rank(self, clause: Clause) -> Option<usize> {
        self.clauses().iter().position(|candidate| *candidate == clause)
    }
}

impl Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Select => "SELECT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        })
    }
}

#[derive(Debug, Clone)]
struct Slot {
    clause: Clause,
    sql: String,
    values: Vec<Value>,
}

/// Accumulated clause slots of one statement.
///
/// The first error raised by a chained call is kept and returned by
/// [`Statement::render`]; later calls do not replace it.
#[derive(Debug, Clone)]
pub struct Statement {
    kind: StatementKind,
    table: String,
    slots: Vec<Slot>,
    error: Option<Error>,
}

impl Statement {
    /// An empty statement of `kind` against `table`.
    #[must_use]
    pub fn new(kind: StatementKind, table: impl Into<String>) -> Self {
        Self {
            kind,
            table: table.into(),
            slots: Vec::new(),
            error: None,
        }
    }

    /// Statement kind.
    #[must_use]
    pub const fn kind(&self) -> StatementKind {
        self.kind
    }

    /// Target table.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Whether a slot for `clause` has been added.
    #[must_use]
    pub fn has(&self, clause: Clause) -> bool {
        self.slots.iter().any(|slot| slot.clause == clause)
    }

    /// Add a clause slot.
    ///
    /// Duplicates are kept and reported at render time.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StatementKind`] straight away, without adding a slot,
    /// if `clause` is outside this statement kind's clause order.
    pub fn push(&mut self, clause: Clause, sql: impl Into<String>, values: Vec<Value>) -> Result<()> {
        if self.kind.rank(clause).is_none() {
            return Err(Error::StatementKind {
                kind: self.kind,
                clause,
            });
        }
        self.slots.push(Slot {
            clause,
            sql: sql.into(),
            values,
        });
        Ok(())
    }

    /// Add a clause slot, recording any error for [`Statement::render`].
    pub(crate) fn append(&mut self, clause: Clause, sql: impl Into<String>, values: Vec<Value>) {
        let result = self.push(clause, sql, values);
        self.check(result);
    }

    /// Add the WHERE clause for `predicate`, whose columns must all belong to
    /// the statement's table.
    pub(crate) fn filter(&mut self, predicate: &Predicate) {
        if let Err(err) = predicate.check_table(&self.table) {
            self.fail(err);
            return;
        }
        let fragment = predicate.render();
        self.append(Clause::Where, format!("WHERE {}", fragment.sql), fragment.values);
    }

    /// Record an error raised while chaining.
    pub fn fail(&mut self, error: Error) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    /// Record `result`'s error, if any.
    pub fn check(&mut self, result: Result<()>) {
        if let Err(err) = result {
            self.fail(err);
        }
    }

    /// Validate and render the statement.
    ///
    /// The accumulated slots are left untouched, so rendering is repeatable.
    ///
    /// # Errors
    ///
    /// Returns the first error recorded while chaining, or
    /// [`Error::MissingClause`], [`Error::UnsupportedCombination`] or
    /// [`Error::DuplicateClause`] when the slots do not form a valid statement.
    pub fn render(&self) -> Result<Query> {
        if let Some(err) = &self.error {
            return Err(err.clone());
        }

        for clause in self.kind.mandatory() {
            if !self.has(*clause) {
                return Err(Error::MissingClause(*clause));
            }
        }

        let limited = self.has(Clause::Limit) || self.has(Clause::Offset);
        if self.kind == StatementKind::Update && limited && !self.has(Clause::Returning) {
            return Err(Error::UnsupportedCombination(
                "LIMIT or OFFSET on an update requires RETURNING",
            ));
        }

        // OFFSET alone is not accepted by the storage engine; -1 means unbounded
        let unbounded = Slot {
            clause: Clause::Limit,
            sql: "LIMIT -1".to_string(),
            values: Vec::new(),
        };
        let mut slots: Vec<&Slot> = self.slots.iter().collect();
        if self.has(Clause::Offset) && !self.has(Clause::Limit) {
            slots.push(&unbounded);
        }
        slots.sort_by_key(|slot| self.kind.rank(slot.clause));

        if let Some(pair) = slots.windows(2).find(|pair| pair[0].clause == pair[1].clause) {
            return Err(Error::DuplicateClause(pair[0].clause));
        }

        let sql = slots.iter().map(|slot| slot.sql.as_str()).collect::<Vec<_>>().join(" ");
        let params = slots.iter().flat_map(|slot| slot.values.iter()).map(coerce).collect();
        let query = Query { sql, params };

        tracing::debug!(
            table = %self.table,
            kind = %self.kind,
            sql = %query.sql,
            param_count = query.params.len(),
            "statement generated SQL"
        );

        Ok(query)
    }
}
