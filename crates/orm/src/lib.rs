//! # Keel ORM
//!
//! Typed record schemas and type-checked statement building over an embedded
//! SQL database.
//!
//! # Quick Start
//!
//! ## Define Entities
//!
//! ```ignore
//! use keel_orm::entity;
//!
//! entity! {
//!     primary_key = id,
//!     #[derive(Debug, Clone, PartialEq)]
//!     pub struct Artist {
//!         pub id: i64,
//!         pub name: String,
//!     }
//! }
//!
//! entity! {
//!     primary_key = id,
//!     foreign_keys = [(artist_id, Artist, id)],
//!     #[derive(Debug, Clone, PartialEq)]
//!     pub struct Album {
//!         pub id: i64,
//!         pub title: String,
//!         pub year: i64,
//!         pub artist_id: i64,
//!     }
//! }
//! ```
//!
//! ## Create Tables and Insert
//!
//! ```ignore
//! let engine = Engine::in_memory()?;
//! engine.push(Artist::schema())?;
//! engine.push(Album::schema())?;
//!
//! let mut artists = [Artist { id: 0, name: "Nina Simone".into() }];
//! engine.insert(&mut artists)?;
//! // artists[0].id now holds the generated key
//! ```
//!
//! ## Query
//!
//! ```ignore
//! // whole records
//! let albums: Vec<Album> = engine
//!     .query(Album::table())
//!     .r#where(Album::column("year")?.ge(1960)?.and(Album::column("year")?.lt(1970)?))
//!     .order_by(Album::column("year")?)
//!     .limit(10)
//!     .all()?;
//!
//! // tuples
//! let per_artist = engine
//!     .query([Album::column("artist_id")?, Album::column("id")?.count()])
//!     .group_by(Album::column("artist_id")?)
//!     .all()?;
//! ```
//!
//! ## Update and Delete
//!
//! ```ignore
//! let years = engine
//!     .update([Album::column("year")?.add(1)?])
//!     .r#where(Album::column("id")?.eq(album.id)?)
//!     .returning(Album::column("year")?)
//!     .all()?;
//!
//! let removed: Vec<Album> = engine
//!     .delete(Album::table())
//!     .r#where(Album::column("artist_id")?.in_list([1, 2])?)
//!     .returning_all()
//!     .all()?;
//! ```
//!
//! Operand types are checked when a clause is built, so
//! `Album::column("year")?.eq("1960")` fails with [`Error::TypeMismatch`]
//! before any SQL exists. Clause order, duplicate clauses and clause
//! combinations are checked when a statement is rendered.

#![forbid(unsafe_code)]

mod column;
mod delete;
mod engine;
mod entity;
mod error;
mod filter;
mod insert;
mod query;
mod schema;
mod select;
mod statement;
mod update;
mod value;

pub use column::{Aggregate, Column, IntoColumns, Selectable, Selection};
pub use delete::DeleteBuilder;
pub use engine::Engine;
pub use entity::{Entity, FromRow, Table};
pub use error::{Error, Result};
pub use filter::{Arithmetic, Assignment, Comparison, Fragment, Predicate};
pub use insert::InsertBuilder;
// Re-export the storage types rendered statements and rows are made of.
pub use keel_sql::{Connection, DataType, Field, Row};
pub use query::Query;
pub use schema::{FieldDef, ForeignKeyDef, Schema};
pub use select::SelectBuilder;
pub use statement::{Clause, Statement, StatementKind};
pub use update::UpdateBuilder;
pub use value::{Affinity, FieldKind, FieldValue, Value, coerce};

// Re-exports for ``entity`` macro use only.
#[doc(hidden)]
pub mod __private {
    pub use crate::entity::decode;
}
