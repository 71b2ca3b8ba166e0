//! Default `SQLite` implementation of [`Connection`].
//!
//! Uses the bundled `SQLite` engine through `rusqlite`. Statements run in
//! autocommit mode unless the caller has opened a transaction, in which case
//! [`Connection::commit`] commits it.

use std::path::Path;

use anyhow::{Context, Result, bail};
use fromenv::FromEnv;
use rusqlite::types::{Value as SqliteValue, ValueRef};
use rusqlite::{Connection as SqliteConnection, params_from_iter};
use tracing::instrument;

use crate::resource::{Connection, DataType, Field, Row};
use crate::traits::Backend;

const TABLE_EXISTS: &str = "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?";

/// Options used to connect to the SQL database.
///
/// This struct is used to load connection options from environment variables.
#[derive(Debug, Clone, FromEnv)]
pub struct ConnectOptions {
    /// Path to the database file, or `:memory:`.
    #[env(from = "SQL_DATABASE", default = ":memory:")]
    pub database: String,

    /// Whether foreign-key constraints are enforced (`on` or `off`).
    #[env(from = "SQL_FOREIGN_KEYS", default = "on")]
    pub foreign_keys: String,
}

impl ConnectOptions {
    /// Options for the database at `database` with foreign keys enforced.
    #[must_use]
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            foreign_keys: "on".to_string(),
        }
    }

    fn foreign_keys_pragma(&self) -> Result<&'static str> {
        match self.foreign_keys.to_ascii_lowercase().as_str() {
            "on" | "true" | "1" => Ok("ON"),
            "off" | "false" | "0" => Ok("OFF"),
            other => bail!("invalid SQL_FOREIGN_KEYS value '{other}'; expected on or off"),
        }
    }
}

impl crate::FromEnv for ConnectOptions {
    fn from_env() -> Result<Self> {
        Self::from_env().finalize().context("issue loading connection options")
    }
}

/// Default implementation of [`Connection`], backed by `SQLite`.
///
/// `rusqlite::Connection` is `Send` but not `Sync`, so neither is this type:
/// it is not internally synchronized.
#[derive(Debug)]
pub struct SqlDefault {
    conn: SqliteConnection,
}

impl SqlDefault {
    /// Open the database at `path`, enforcing foreign keys.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::connect_with(ConnectOptions::new(path.as_ref().to_string_lossy()))
    }

    /// Open a private in-memory database, enforcing foreign keys.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened.
    pub fn in_memory() -> Result<Self> {
        Self::connect_with(ConnectOptions::new(":memory:"))
    }
}

impl Backend for SqlDefault {
    type ConnectOptions = ConnectOptions;

    #[instrument]
    fn connect_with(options: Self::ConnectOptions) -> Result<Self> {
        tracing::debug!("initializing SQLite connection to: {}", options.database);

        let conn =
            SqliteConnection::open(&options.database).context("failed to open SQLite database")?;
        let pragma = options.foreign_keys_pragma()?;
        conn.execute_batch(&format!("PRAGMA foreign_keys = {pragma};"))
            .context("failed to configure foreign keys")?;

        Ok(Self { conn })
    }
}

impl Connection for SqlDefault {
    fn query(&self, sql: &str, params: &[DataType]) -> Result<Vec<Row>> {
        tracing::debug!("executing query: {}", sql);

        let mut stmt = self.conn.prepare(sql)?;
        let column_names: Vec<String> =
            stmt.column_names().iter().map(ToString::to_string).collect();

        let sqlite_params: Vec<SqliteValue> = params.iter().map(to_sqlite_value).collect();
        let mut rows = stmt.query(params_from_iter(sqlite_params.iter()))?;

        let mut result_rows = Vec::new();
        while let Some(row) = rows.next()? {
            let mut fields = Vec::with_capacity(column_names.len());
            for (i, name) in column_names.iter().enumerate() {
                let value = from_sqlite_value(row.get_ref(i)?)?;
                fields.push(Field {
                    name: name.clone(),
                    value,
                });
            }
            result_rows.push(Row { fields });
        }

        Ok(result_rows)
    }

    fn exec(&self, sql: &str, params: &[DataType]) -> Result<u64> {
        tracing::debug!("executing statement: {}", sql);

        let mut stmt = self.conn.prepare(sql)?;
        let sqlite_params: Vec<SqliteValue> = params.iter().map(to_sqlite_value).collect();
        let rows_affected = stmt.execute(params_from_iter(sqlite_params.iter()))?;

        Ok(rows_affected as u64)
    }

    fn commit(&self) -> Result<()> {
        if !self.conn.is_autocommit() {
            self.conn.execute_batch("COMMIT;")?;
        }
        Ok(())
    }

    fn table_exists(&self, name: &str) -> Result<bool> {
        let mut stmt = self.conn.prepare(TABLE_EXISTS)?;
        Ok(stmt.exists([name])?)
    }
}

fn to_sqlite_value(value: &DataType) -> SqliteValue {
    match value {
        DataType::Null => SqliteValue::Null,
        DataType::Integer(i) => SqliteValue::Integer(*i),
        DataType::Real(f) => SqliteValue::Real(*f),
        DataType::Text(s) => SqliteValue::Text(s.clone()),
        DataType::Blob(b) => SqliteValue::Blob(b.clone()),
    }
}

fn from_sqlite_value(value: ValueRef) -> Result<DataType> {
    match value {
        ValueRef::Null => Ok(DataType::Null),
        ValueRef::Integer(i) => Ok(DataType::Integer(i)),
        ValueRef::Real(f) => Ok(DataType::Real(f)),
        ValueRef::Text(t) => {
            let s = std::str::from_utf8(t).context("invalid UTF-8 in text value")?;
            Ok(DataType::Text(s.to_string()))
        }
        ValueRef::Blob(b) => Ok(DataType::Blob(b.to_vec())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqlite_operations() {
        let conn = SqlDefault::in_memory().expect("connect");

        assert!(!conn.table_exists("users").expect("catalog"));

        let rows_affected = conn
            .exec("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT, age INTEGER)", &[])
            .expect("create table");
        assert_eq!(rows_affected, 0);
        assert!(conn.table_exists("users").expect("catalog"));

        let rows_affected = conn
            .exec(
                "INSERT INTO users (name, age) VALUES (?, ?)",
                &[DataType::Text("Alice".to_string()), DataType::Integer(30)],
            )
            .expect("insert");
        assert_eq!(rows_affected, 1);

        let returned = conn
            .query(
                "INSERT INTO users (name, age) VALUES (?, ?) RETURNING *",
                &[DataType::Text("Bob".to_string()), DataType::Integer(25)],
            )
            .expect("insert returning");
        assert_eq!(returned.len(), 1);
        assert_eq!(returned[0].fields[0].value, DataType::Integer(2));
        conn.commit().expect("commit");

        let rows = conn.query("SELECT id, name, age FROM users ORDER BY name", &[]).expect("query");

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].fields[1].name, "name");
        assert_eq!(rows[0].fields[1].value, DataType::Text("Alice".to_string()));
        assert_eq!(rows[1].clone().into_values()[2], DataType::Integer(25));
    }

    #[test]
    fn foreign_keys_enforced() {
        let conn = SqlDefault::in_memory().expect("connect");
        conn.exec("CREATE TABLE artist (id INTEGER PRIMARY KEY)", &[]).expect("create artist");
        conn.exec(
            "CREATE TABLE album (id INTEGER PRIMARY KEY, artist_id INTEGER, \
             FOREIGN KEY (artist_id) REFERENCES artist (id))",
            &[],
        )
        .expect("create album");

        let err = conn
            .exec("INSERT INTO album (artist_id) VALUES (?)", &[DataType::Integer(7)])
            .unwrap_err();
        let sqlite_err = err.downcast_ref::<rusqlite::Error>().expect("rusqlite error");
        assert_eq!(sqlite_err.sqlite_error_code(), Some(rusqlite::ErrorCode::ConstraintViolation));
    }

    #[test]
    fn invalid_foreign_keys_option() {
        let options = ConnectOptions {
            database: ":memory:".to_string(),
            foreign_keys: "sometimes".to_string(),
        };
        assert!(SqlDefault::connect_with(options).is_err());
    }
}
