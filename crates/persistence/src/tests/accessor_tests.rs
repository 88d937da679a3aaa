// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use super::create_test_database;
use crate::{
    Condition, Database, Direction, EntityAccessor, ErrorClass, IdRow, Operator,
    PersistenceError, ProductRow, Query, Record,
};

fn product_record(part_number: &str, quantity: i64) -> Record {
    Record::new()
        .set("part_number", part_number)
        .set("quantity", quantity)
        .set("created_at", "2026-03-01 12:00:00")
}

fn products(db: &Database) -> EntityAccessor {
    db.accessor("products")
}

#[test]
fn test_accessor_table_is_fixed() {
    let db: Database = create_test_database();
    let accessor: EntityAccessor = products(&db);

    assert_eq!(accessor.table(), "products");
    assert!(!accessor.is_connected(), "connection is created on first use");
}

#[test]
fn test_insert_returns_generated_id() {
    let db: Database = create_test_database();
    let mut accessor: EntityAccessor = products(&db);

    let first: i64 = accessor.insert(&product_record("BOLT-1", 5)).unwrap();
    let second: i64 = accessor.insert(&product_record("BOLT-2", 7)).unwrap();

    assert!(second > first);
    let row: ProductRow = accessor.find_by_id(second).unwrap().unwrap();
    assert_eq!(row.part_number, "BOLT-2");
    assert_eq!(row.quantity, 7);
    assert_eq!(row.updated_at, None);
}

#[test]
fn test_duplicate_key_is_classified() {
    let db: Database = create_test_database();
    let mut accessor: EntityAccessor = products(&db);
    accessor.insert(&product_record("NUT-1", 1)).unwrap();

    let result: Result<i64, PersistenceError> = accessor.insert(&product_record("NUT-1", 2));

    match result {
        Err(err) => {
            assert_eq!(err.class(), ErrorClass::DuplicateKey);
            assert!(matches!(err, PersistenceError::DuplicateKey(_)));
        }
        Ok(id) => panic!("Expected DuplicateKey, got id {id}"),
    }
}

#[test]
fn test_get_applies_filter_and_order() {
    let db: Database = create_test_database();
    let mut accessor: EntityAccessor = products(&db);
    for (part_number, quantity) in [("A-1", 1), ("A-2", 20), ("A-3", 30), ("B-1", 40)] {
        accessor.insert(&product_record(part_number, quantity)).unwrap();
    }

    let rows: Vec<ProductRow> = accessor
        .get(
            Query::new()
                .filter(vec![
                    Condition::with_op("part_number", Operator::Like, "A-%"),
                    Condition::with_op("quantity", Operator::Gt, 5),
                ])
                .order_by([("quantity", Direction::Desc)]),
        )
        .unwrap();

    let parts: Vec<&str> = rows.iter().map(|row| row.part_number.as_str()).collect();
    assert_eq!(parts, vec!["A-3", "A-2"]);
}

#[test]
fn test_first_and_exists_on_missing_row() {
    let db: Database = create_test_database();
    let mut accessor: EntityAccessor = products(&db);

    let row: Option<ProductRow> = accessor.find_by_id(404).unwrap();
    assert!(row.is_none());
    assert!(!accessor.exists(404).unwrap());
}

#[test]
fn test_update_changes_only_matched_rows() {
    let db: Database = create_test_database();
    let mut accessor: EntityAccessor = products(&db);
    let target: i64 = accessor.insert(&product_record("C-1", 1)).unwrap();
    let other: i64 = accessor.insert(&product_record("C-2", 1)).unwrap();

    let affected: usize = accessor
        .update(
            Query::new().filter(vec![Condition::new("id", target)]),
            &Record::new().set("quantity", 99).set("location", "Shelf 4"),
        )
        .unwrap();

    assert_eq!(affected, 1);
    let updated: ProductRow = accessor.find_by_id(target).unwrap().unwrap();
    assert_eq!(updated.quantity, 99);
    assert_eq!(updated.location.as_deref(), Some("Shelf 4"));
    let untouched: ProductRow = accessor.find_by_id(other).unwrap().unwrap();
    assert_eq!(untouched.quantity, 1);
}

#[test]
fn test_delete_returns_affected_count() {
    let db: Database = create_test_database();
    let mut accessor: EntityAccessor = products(&db);
    for part_number in ["D-1", "D-2", "E-1"] {
        accessor.insert(&product_record(part_number, 1)).unwrap();
    }

    let removed: usize = accessor
        .delete(Query::new().filter(vec![Condition::with_op(
            "part_number",
            Operator::Like,
            "D-%",
        )]))
        .unwrap();

    assert_eq!(removed, 2);
    let remaining: Vec<IdRow> = accessor.get(Query::new().select(["id"])).unwrap();
    assert_eq!(remaining.len(), 1);
}

#[test]
fn test_accessors_on_one_database_share_data() {
    let db: Database = create_test_database();
    let mut writer: EntityAccessor = products(&db);
    let mut reader: EntityAccessor = products(&db);

    let id: i64 = writer.insert(&product_record("SHARED-1", 3)).unwrap();

    assert!(reader.exists(id).unwrap());
}

#[test]
fn test_close_then_reuse_reconnects() {
    let db: Database = create_test_database();
    let mut accessor: EntityAccessor = products(&db);
    let id: i64 = accessor.insert(&product_record("F-1", 1)).unwrap();
    assert!(accessor.is_connected());

    accessor.close();
    assert!(!accessor.is_connected());

    assert!(accessor.exists(id).unwrap());
    assert!(accessor.is_connected());
}
