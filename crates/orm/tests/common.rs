//! Common test helpers shared across integration tests.
#![allow(dead_code)]

use chrono::{DateTime, NaiveDate, Utc};
use keel_orm::{Engine, Entity, entity};
use tracing_subscriber::EnvFilter;

// Common test entities used across multiple test files

entity! {
    primary_key = id,
    #[derive(Debug, Clone, PartialEq)]
    pub struct A {
        pub id: i64,
        pub num: i64,
        pub string: String,
    }
}

entity! {
    primary_key = id,
    #[derive(Debug, Clone, PartialEq)]
    pub struct Member {
        pub id: i64,
        pub name: String,
        pub active: bool,
        pub score: f64,
        pub nickname: Option<String>,
        pub joined: NaiveDate,
        pub last_seen: DateTime<Utc>,
        pub settings: serde_json::Value,
        pub avatar: Vec<u8>,
    }
}

entity! {
    primary_key = id,
    #[derive(Debug, Clone, PartialEq)]
    pub struct Artist {
        pub id: i64,
        pub name: String,
    }
}

entity! {
    primary_key = id,
    foreign_keys = [(artist_id, Artist, id)],
    #[derive(Debug, Clone, PartialEq)]
    pub struct Album {
        pub id: i64,
        pub title: String,
        pub artist_id: i64,
    }
}

/// An unsaved `A`; the storage engine assigns its id on insert.
pub fn a(num: i64, string: &str) -> A {
    A {
        id: 0,
        num,
        string: string.to_string(),
    }
}

/// Route rendered statements to the test output; filter with `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// An in-memory engine with the `a` table created.
#[allow(clippy::missing_panics_doc)]
pub fn engine() -> Engine {
    init_tracing();
    let engine = Engine::in_memory().expect("open in-memory database");
    engine.push(A::schema()).expect("create table a");
    engine
}

/// An engine holding one `A` per entry of `nums`, inserted in order.
#[allow(clippy::missing_panics_doc)]
pub fn seeded(nums: &[i64]) -> (Engine, Vec<A>) {
    let engine = engine();
    let mut rows: Vec<A> = nums.iter().map(|num| a(*num, &format!("t{num}"))).collect();
    engine.insert(&mut rows).expect("insert rows");
    (engine, rows)
}

/// Normalize SQL by collapsing whitespace.
fn normalize_sql(sql: &str) -> String {
    sql.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Canonicalize SQL for comparison by removing identifier quotes and normalizing whitespace.
/// Preserves quotes inside string literals.
fn canonicalize_sql(sql: &str) -> String {
    let mut cleaned = String::with_capacity(sql.len());
    let mut in_single_quote = false;

    for ch in sql.chars() {
        match ch {
            '\'' => {
                in_single_quote = !in_single_quote;
                cleaned.push(ch);
            }
            '"' if !in_single_quote => {
                // Strip identifier quoting to avoid brittle comparisons.
            }
            _ => cleaned.push(ch),
        }
    }

    normalize_sql(&cleaned)
}

/// Assert that SQL contains all expected fragments in order.
///
/// Identifier quotes are stripped and whitespace normalized, so builder
/// output and hand-written fragments compare equal.
#[allow(clippy::missing_panics_doc)]
pub fn assert_sql_contains(actual: &str, fragments: &[&str]) {
    let actual_canonical = canonicalize_sql(actual);
    let mut search_start = 0usize;

    for fragment in fragments {
        let fragment_canonical = canonicalize_sql(fragment);
        if fragment_canonical.is_empty() {
            continue;
        }

        if let Some(pos) = actual_canonical[search_start..].find(&fragment_canonical) {
            search_start += pos + fragment_canonical.len();
        } else {
            panic!(
                "expected SQL fragment `{fragment_canonical}` not found in `{actual_canonical}`"
            );
        }
    }
}
