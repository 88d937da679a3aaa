// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Statement rendering.
//!
//! These tests never touch a database. They pin the rendered SQL text and
//! the positional correspondence between `?` placeholders and bound values.

use crate::{
    Condition, Direction, ErrorClass, JoinKind, Operator, Query, Record, SqlValue, Statement,
};

fn assert_binds_match_placeholders(statement: &Statement) {
    assert_eq!(
        statement.placeholder_count(),
        statement.binds().len(),
        "placeholders and binds diverged in: {}",
        statement.sql()
    );
}

#[test]
fn test_default_query_renders_tautology() {
    let statement: Statement = Query::new().into_select("products");

    assert_eq!(statement.sql(), "SELECT * FROM products WHERE 1=1");
    assert!(statement.binds().is_empty());
}

#[test]
fn test_full_select_renders_every_clause_in_order() {
    let statement: Statement = Query::new()
        .select(["history.action_type", "COUNT(*) AS total"])
        .left_join("users performer", "history.performed_by = performer.id")
        .filter(vec![Condition::new("history.performed_by", 7)])
        .group_by(["history.action_type"])
        .order_by([("total", Direction::Desc)])
        .limit(5)
        .into_select("history");

    assert_eq!(
        statement.sql(),
        "SELECT history.action_type, COUNT(*) AS total FROM history \
         LEFT JOIN users performer ON history.performed_by = performer.id \
         WHERE history.performed_by = ? \
         GROUP BY history.action_type ORDER BY total DESC LIMIT 5"
    );
    assert_eq!(statement.binds(), &[SqlValue::Integer(7)]);
}

#[test]
fn test_joins_accumulate_in_call_order() {
    let statement: Statement = Query::new()
        .inner_join("a", "a.id = t.a_id")
        .join("b", "b.id = t.b_id", JoinKind::Right)
        .left_join("c", "c.id = t.c_id")
        .into_select("t");

    assert_eq!(
        statement.sql(),
        "SELECT * FROM t INNER JOIN a ON a.id = t.a_id RIGHT JOIN b ON b.id = t.b_id \
         LEFT JOIN c ON c.id = t.c_id WHERE 1=1"
    );
}

#[test]
fn test_null_checks_do_not_bind() {
    let statement: Statement = Query::new()
        .filter(vec![
            Condition::is_null("target_user"),
            Condition::is_not_null("target_product"),
        ])
        .into_select("history");

    assert_eq!(
        statement.sql(),
        "SELECT * FROM history WHERE target_user IS NULL AND target_product IS NOT NULL"
    );
    assert!(statement.binds().is_empty());
    assert_binds_match_placeholders(&statement);
}

#[test]
fn test_binds_follow_condition_order_around_null_checks() {
    let statement: Statement = Query::new()
        .filter(vec![
            Condition::new("action_type", "Product Created"),
            Condition::is_not_null("target_product"),
            Condition::with_op("created_at", Operator::Ge, "2026-01-01 00:00:00"),
            Condition::is_null("target_user"),
            Condition::with_op("description", Operator::Like, "%bolt%"),
        ])
        .into_select("history");

    assert_eq!(
        statement.sql(),
        "SELECT * FROM history WHERE action_type = ? AND target_product IS NOT NULL \
         AND created_at >= ? AND target_user IS NULL AND description LIKE ?"
    );
    assert_eq!(
        statement.binds(),
        &[
            SqlValue::from("Product Created"),
            SqlValue::from("2026-01-01 00:00:00"),
            SqlValue::from("%bolt%"),
        ]
    );
    assert_binds_match_placeholders(&statement);
}

#[test]
fn test_not_null_marker_only_applies_to_is() {
    // With `=`, "NOT NULL" is an ordinary string value.
    let statement: Statement = Query::new()
        .filter(vec![Condition::new("status", "NOT NULL")])
        .into_select("products");

    assert_eq!(statement.sql(), "SELECT * FROM products WHERE status = ?");
    assert_eq!(statement.binds(), &[SqlValue::from("NOT NULL")]);
}

#[test]
fn test_is_with_ordinary_value_binds() {
    let statement: Statement = Query::new()
        .filter(vec![Condition::with_op("status", Operator::Is, 1)])
        .into_select("products");

    assert_eq!(statement.sql(), "SELECT * FROM products WHERE status IS ?");
    assert_binds_match_placeholders(&statement);
}

#[test]
fn test_any_of_binds_once_per_field() {
    let statement: Statement = Query::new()
        .filter(vec![
            Condition::any_of(["performed_by", "target_user"], Operator::Eq, 3),
            Condition::new("action_type", "User Updated"),
        ])
        .into_select("history");

    assert_eq!(
        statement.sql(),
        "SELECT * FROM history WHERE (performed_by = ? OR target_user = ?) AND action_type = ?"
    );
    assert_eq!(
        statement.binds(),
        &[
            SqlValue::Integer(3),
            SqlValue::Integer(3),
            SqlValue::from("User Updated"),
        ]
    );
}

#[test]
fn test_any_of_without_fields_matches_nothing() {
    let statement: Statement = Query::new()
        .filter(vec![
            Condition::any_of(Vec::<String>::new(), Operator::Eq, 3),
            Condition::new("action_type", "User Updated"),
        ])
        .into_select("history");

    assert_eq!(
        statement.sql(),
        "SELECT * FROM history WHERE 1=0 AND action_type = ?"
    );
    assert_eq!(statement.binds(), &[SqlValue::from("User Updated")]);
    assert_binds_match_placeholders(&statement);
}

#[test]
fn test_filter_replaces_previous_conditions() {
    let statement: Statement = Query::new()
        .filter(vec![
            Condition::new("category", "Fasteners"),
            Condition::new("status", 1),
        ])
        .filter(vec![Condition::new("brand", "Acme")])
        .into_select("products");

    assert_eq!(statement.sql(), "SELECT * FROM products WHERE brand = ?");
    assert_eq!(statement.binds(), &[SqlValue::from("Acme")]);
}

#[test]
fn test_empty_filter_restores_tautology() {
    let statement: Statement = Query::new()
        .filter(vec![Condition::new("id", 1)])
        .filter(Vec::new())
        .into_select("products");

    assert_eq!(statement.sql(), "SELECT * FROM products WHERE 1=1");
    assert!(statement.binds().is_empty());
}

#[test]
fn test_reset_returns_default_state() {
    let query: Query = Query::new()
        .select(["id"])
        .left_join("users u", "u.id = t.user_id")
        .filter(vec![Condition::new("id", 1)])
        .group_by(["id"])
        .order_by([("id", Direction::Asc)])
        .limit(1);
    assert!(!query.is_default());

    let query: Query = query.reset();

    assert!(query.is_default());
    assert_eq!(query, Query::default());
    assert_eq!(query.into_select("t").sql(), "SELECT * FROM t WHERE 1=1");
}

#[test]
fn test_update_binds_assignments_before_predicate() {
    let record: Record = Record::new().set("quantity", 4).set("location", "B-12");
    let statement: Statement = Query::new()
        .filter(vec![
            Condition::new("id", 9),
            Condition::is_not_null("category"),
        ])
        .into_update("products", &record)
        .unwrap();

    assert_eq!(
        statement.sql(),
        "UPDATE products SET quantity = ?, location = ? WHERE id = ? AND category IS NOT NULL"
    );
    assert_eq!(
        statement.binds(),
        &[
            SqlValue::Integer(4),
            SqlValue::from("B-12"),
            SqlValue::Integer(9),
        ]
    );
    assert_binds_match_placeholders(&statement);
}

#[test]
fn test_update_without_assignments_is_rejected() {
    let result = Query::new().into_update("products", &Record::new());

    match result {
        Err(err) => assert_eq!(err.class(), ErrorClass::Other),
        Ok(statement) => panic!("Expected an error, got: {statement:?}"),
    }
}

#[test]
fn test_delete_renders_predicate() {
    let statement: Statement = Query::new()
        .filter(vec![Condition::with_op(
            "created_at",
            Operator::Lt,
            "2026-01-01 00:00:00",
        )])
        .into_delete("history");

    assert_eq!(statement.sql(), "DELETE FROM history WHERE created_at < ?");
    assert_binds_match_placeholders(&statement);
}

#[test]
fn test_unconditional_delete_uses_tautology() {
    assert_eq!(
        Query::new().into_delete("history").sql(),
        "DELETE FROM history WHERE 1=1"
    );
}

#[test]
fn test_insert_preserves_record_order() {
    let record: Record = Record::new()
        .set("part_number", "BOLT-10")
        .set("price", 0.25)
        .set("supplier", None::<String>)
        .set("quantity", 100);
    let statement: Statement = record.to_insert("products").unwrap();

    assert_eq!(
        statement.sql(),
        "INSERT INTO products (part_number, price, supplier, quantity) VALUES (?, ?, ?, ?)"
    );
    assert_eq!(
        statement.binds(),
        &[
            SqlValue::from("BOLT-10"),
            SqlValue::Real(0.25),
            SqlValue::Null,
            SqlValue::Integer(100),
        ]
    );
}

#[test]
fn test_record_set_replaces_in_place() {
    let record: Record = Record::new()
        .set("a", 1)
        .set("b", 2)
        .set("a", 3);

    assert_eq!(record.columns().collect::<Vec<_>>(), vec!["a", "b"]);
    assert_eq!(
        record.values().cloned().collect::<Vec<_>>(),
        vec![SqlValue::Integer(3), SqlValue::Integer(2)]
    );
    assert_eq!(record.len(), 2);
}

#[test]
fn test_insert_without_columns_is_rejected() {
    assert!(Record::new().to_insert("products").is_err());
}
