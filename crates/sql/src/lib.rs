//! # Keel SQL
//!
//! The storage-engine capability consumed by `keel-orm`.
//!
//! The ORM never talks to a database directly. It renders parameterized SQL
//! and hands it to a [`Connection`], receiving [`Row`]s of storage-native
//! [`DataType`] values back. [`SqlDefault`] is the bundled `SQLite`
//! implementation.

#![forbid(unsafe_code)]

pub mod default_impl;
mod resource;
mod traits;

pub use crate::default_impl::{ConnectOptions, SqlDefault};
pub use crate::resource::*;
pub use crate::traits::*;
