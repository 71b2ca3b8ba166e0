#![allow(missing_docs)]

//! Rendered SQL and bound parameters, checked without executing.

mod common;

use common::{A, Album, Member, assert_sql_contains, engine};
use keel_orm::{
    Aggregate, Clause, Column, DataType, Entity, Error, FieldKind, InsertBuilder, Statement,
    StatementKind, Value,
};

fn col(name: &str) -> Column {
    A::column(name).expect("column exists")
}

// ============================================================================
// Column expressions
// ============================================================================

#[test]
fn comparison_operators() {
    let cases = [
        (col("num").eq(1), "num = ?"),
        (col("num").ne(1), "num != ?"),
        (col("num").lt(1), "num < ?"),
        (col("num").le(1), "num <= ?"),
        (col("num").gt(1), "num > ?"),
        (col("num").ge(1), "num >= ?"),
    ];
    for (predicate, expected) in cases {
        let fragment = predicate.unwrap().render();
        assert_eq!(fragment.sql, expected);
        assert_eq!(fragment.values, vec![Value::Integer(1)]);
    }
}

#[test]
fn operand_type_is_checked() {
    let err = col("num").eq("one").unwrap_err();
    let Error::TypeMismatch { table, field, expected, found } = &err else {
        panic!("expected type mismatch, got {err:?}");
    };
    assert_eq!(table, "a");
    assert_eq!(field, "num");
    assert_eq!(*expected, FieldKind::Integer);
    assert_eq!(*found, "text");

    assert!(matches!(col("string").gt(3), Err(Error::TypeMismatch { .. })));
    assert!(matches!(col("num").add("x"), Err(Error::TypeMismatch { .. })));
    assert!(matches!(col("num").in_list([1.5]), Err(Error::TypeMismatch { .. })));
}

#[test]
fn null_requires_nullable_column() {
    assert!(matches!(col("num").eq(Value::Null), Err(Error::TypeMismatch { .. })));

    let nickname = Member::column("nickname").unwrap();
    assert_eq!(nickname.eq(Value::Null).unwrap().render().sql, "nickname IS ?");
    assert_eq!(nickname.ne(None::<String>).unwrap().render().sql, "nickname IS NOT ?");
    assert_eq!(nickname.eq("g").unwrap().render().sql, "nickname = ?");
}

#[test]
fn in_list_renders_one_placeholder_per_value() {
    let fragment = col("num").in_list([1, 2, 3]).unwrap().render();
    assert_eq!(fragment.sql, "num IN (?, ?, ?)");
    assert_eq!(fragment.values, vec![Value::Integer(1), Value::Integer(2), Value::Integer(3)]);
}

#[test]
fn in_list_rejects_empty_operands() {
    let err = col("num").in_list(Vec::<i64>::new()).unwrap_err();
    assert!(matches!(err, Error::EmptyOperand { .. }), "{err:?}");
}

#[test]
fn combinators_parenthesize_and_keep_value_order() {
    let predicate = col("num")
        .gt(1)
        .unwrap()
        .and(col("string").eq("x").unwrap())
        .or(col("id").in_list([7, 8]).unwrap());
    let fragment = predicate.render();

    assert_eq!(fragment.sql, "((num > ? AND string = ?) OR id IN (?, ?))");
    assert_eq!(fragment.values, vec![
        Value::Integer(1),
        Value::Text("x".to_string()),
        Value::Integer(7),
        Value::Integer(8),
    ]);
}

#[test]
fn arithmetic_assignments() {
    let cases = [
        (col("num").add(2), "num = num + ?"),
        (col("num").sub(2), "num = num - ?"),
        (col("num").mul(2), "num = num * ?"),
        (col("num").div(2), "num = num / ?"),
    ];
    for (assignment, expected) in cases {
        let assignment = assignment.unwrap();
        assert_eq!(assignment.table(), "a");
        assert_eq!(assignment.render().sql, expected);
    }
}

#[test]
fn aggregates_render_function_calls() {
    assert_eq!(col("num").count().render(), "COUNT(num)");
    assert_eq!(col("num").sum().render(), "SUM(num)");
    assert_eq!(col("num").avg().render(), "AVG(num)");
    assert_eq!(col("num").min().render(), "MIN(num)");
    assert_eq!(col("num").max().render(), "MAX(num)");
    assert_eq!(col("num").render(), "num");
}

#[test]
fn aggregated_columns_only_select() {
    let err = col("num").sum().gt(3).unwrap_err();
    assert!(matches!(err, Error::AggregatedOperand { aggregate: Aggregate::Sum, .. }), "{err:?}");
    assert_eq!(err.to_string(), "SUM(num) on 'a' cannot be compared or assigned");

    assert!(matches!(col("num").max().add(1), Err(Error::AggregatedOperand { .. })));
    assert!(matches!(col("num").count().in_list([1, 2]), Err(Error::AggregatedOperand { .. })));
    assert!(matches!(col("num").avg().eq(1.5), Err(Error::AggregatedOperand { .. })));
}

#[test]
fn nested_aggregate_is_rejected() {
    let engine = engine();
    let err = engine.query(col("num").count().sum()).build().unwrap_err();
    assert!(
        matches!(
            err,
            Error::NestedAggregate {
                inner: Aggregate::Count,
                outer: Aggregate::Sum,
                ..
            }
        ),
        "{err:?}"
    );

    let err = engine.query(A::table()).order_by(col("num").max().min()).build().unwrap_err();
    assert!(matches!(err, Error::NestedAggregate { .. }), "{err:?}");
}

// ============================================================================
// Select
// ============================================================================

#[test]
fn select_whole_table() {
    let engine = engine();
    let query = engine.query(A::table()).build().unwrap();
    assert_eq!(query.sql, "SELECT * FROM a");
    assert!(query.params.is_empty());
}

#[test]
fn select_clauses_render_in_canonical_order() {
    let engine = engine();
    let query = engine
        .query([col("string"), col("num").sum()])
        .offset(5)
        .limit(10)
        .order_by(col("string"))
        .group_by(col("string"))
        .r#where(col("num").gt(0).unwrap())
        .build()
        .unwrap();

    assert_eq!(
        query.sql,
        "SELECT string, SUM(num) FROM a WHERE num > ? GROUP BY string ORDER BY string ASC \
         LIMIT ? OFFSET ?"
    );
    assert_eq!(query.params, vec![DataType::Integer(0), DataType::Integer(10), DataType::Integer(5)]);
}

#[test]
fn order_by_several_columns_descending() {
    let engine = engine();
    let query = engine.query(A::table()).order_by_desc([col("num"), col("id")]).build().unwrap();
    assert_sql_contains(&query.sql, &["FROM a", "ORDER BY num, id DESC"]);
}

#[test]
fn offset_alone_gets_unbounded_limit() {
    let engine = engine();
    let builder = engine.query(A::table()).offset(3);

    let query = builder.build().unwrap();
    assert_eq!(query.sql, "SELECT * FROM a LIMIT -1 OFFSET ?");
    assert_eq!(query.params, vec![DataType::Integer(3)]);

    // Rendering does not change the builder.
    assert_eq!(builder.build().unwrap(), query);
}

#[test]
fn duplicate_where_is_rejected() {
    let engine = engine();
    let err = engine
        .query(A::table())
        .r#where(col("num").eq(1).unwrap())
        .r#where(col("num").eq(2).unwrap())
        .build()
        .unwrap_err();
    assert!(matches!(err, Error::DuplicateClause(_)), "{err:?}");
    assert_eq!(err.to_string(), "WHERE clause added more than once");
}

#[test]
fn first_chaining_error_wins() {
    let engine = engine();
    let err = engine
        .query(A::table())
        .order_by(Album::column("title").unwrap())
        .limit(1)
        .limit(2)
        .build()
        .unwrap_err();
    assert!(matches!(err, Error::CrossTableSelection { .. }), "{err:?}");
}

#[test]
fn where_on_other_table_is_rejected() {
    let engine = engine();
    let err = engine
        .query(A::table())
        .r#where(col("num").gt(1).unwrap().and(Album::column("id").unwrap().eq(1).unwrap()))
        .build()
        .unwrap_err();
    let Error::CrossTableSelection { expected, found } = &err else {
        panic!("expected cross-table error, got {err:?}");
    };
    assert_eq!(expected, "a");
    assert_eq!(found, "album");
}

#[test]
fn statement_kind_is_checked_when_clause_is_added() {
    let mut statement = Statement::new(StatementKind::Delete, "a");
    statement.push(Clause::Delete, "DELETE FROM a", vec![]).unwrap();

    let err = statement.push(Clause::Limit, "LIMIT ?", vec![Value::Integer(1)]).unwrap_err();
    assert!(matches!(err, Error::StatementKind { clause: Clause::Limit, .. }), "{err:?}");
    assert_eq!(err.to_string(), "LIMIT is not supported on DELETE statements");

    // the rejected clause leaves the statement as it was
    assert_eq!(statement.render().unwrap().sql, "DELETE FROM a");
}

#[test]
fn coerced_parameters() {
    let engine = engine();
    engine.push(Member::schema()).unwrap();
    let active = Member::column("active").unwrap();
    let query = engine.query(Member::table()).r#where(active.eq(true).unwrap()).build().unwrap();
    assert_eq!(query.params, vec![DataType::Integer(1)]);
}

// ============================================================================
// Update and delete
// ============================================================================

#[test]
fn update_clauses_render_in_canonical_order() {
    let engine = engine();
    let query = engine
        .update([col("num").add(1).unwrap(), col("id").mul(2).unwrap()])
        .limit(1)
        .order_by(col("id"))
        .returning([col("id"), col("num")])
        .r#where(col("string").eq("x").unwrap())
        .build()
        .unwrap();

    assert_eq!(
        query.sql,
        "UPDATE a SET num = num + ?, id = id * ? WHERE string = ? RETURNING id, num \
         ORDER BY id ASC LIMIT ?"
    );
    assert_eq!(query.params, vec![
        DataType::Integer(1),
        DataType::Integer(2),
        DataType::Text("x".to_string()),
        DataType::Integer(1),
    ]);
}

#[test]
fn delete_renders_where_and_returning() {
    let engine = engine();
    let query = engine
        .delete(A::table())
        .returning_all()
        .r#where(col("id").eq(3).unwrap())
        .build()
        .unwrap();
    assert_eq!(query.sql, "DELETE FROM a WHERE id = ? RETURNING *");
    assert_eq!(query.params, vec![DataType::Integer(3)]);
}

// ============================================================================
// Insert
// ============================================================================

#[test]
fn insert_skips_unset_primary_key() {
    let record = A {
        id: 0,
        num: 5,
        string: "x".to_string(),
    };
    let query = InsertBuilder::from_entity(&record).build().unwrap();
    assert_sql_contains(&query.sql, &["INSERT INTO a (num, string) VALUES (?, ?)", "RETURNING *"]);
    assert_eq!(query.params, vec![DataType::Integer(5), DataType::Text("x".to_string())]);
}

#[test]
fn insert_keeps_explicit_primary_key() {
    let record = A {
        id: 9,
        num: 5,
        string: "x".to_string(),
    };
    let query = InsertBuilder::from_entity(&record).replace().build().unwrap();
    assert_sql_contains(&query.sql, &["REPLACE INTO a (id, num, string) VALUES (?, ?, ?)"]);
    assert_eq!(query.params.len(), 3);
}

#[test]
fn insert_set_is_type_checked() {
    let query = InsertBuilder::<A>::new().set("num", 4).build().unwrap();
    assert_sql_contains(&query.sql, &["INSERT INTO a (num) VALUES (?)"]);

    let err = InsertBuilder::<A>::new().set("num", "four").build().unwrap_err();
    assert!(matches!(err, Error::TypeMismatch { .. }), "{err:?}");

    let err = InsertBuilder::<A>::new().set("nope", 1).build().unwrap_err();
    assert!(matches!(err, Error::UnknownField { .. }), "{err:?}");
}

#[test]
fn insert_without_values_uses_defaults() {
    let query = InsertBuilder::<A>::new().build().unwrap();
    assert_sql_contains(&query.sql, &["INSERT INTO a DEFAULT VALUES RETURNING *"]);
    assert!(query.params.is_empty());
}
