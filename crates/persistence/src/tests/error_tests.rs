// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Classification of backend errors into [`ErrorClass`].

use diesel::result::{DatabaseErrorKind, Error as DieselError};

use super::create_test_database;
use crate::error::parse_foreign_key_column;
use crate::{Database, EntityAccessor, ErrorClass, PersistenceError, Record};

const MYSQL_FK_MESSAGE: &str = "Cannot add or update a child row: a foreign key constraint fails \
    (`stockroom`.`history`, CONSTRAINT `fk_history_target_user` FOREIGN KEY (`target_user`) \
    REFERENCES `users` (`id`) ON DELETE SET NULL)";

fn database_error(kind: DatabaseErrorKind, message: &str) -> PersistenceError {
    PersistenceError::from(DieselError::DatabaseError(
        kind,
        Box::new(message.to_string()),
    ))
}

#[test]
fn test_foreign_key_column_parsed_from_mysql_message() {
    assert_eq!(
        parse_foreign_key_column(MYSQL_FK_MESSAGE),
        Some(String::from("target_user"))
    );
}

#[test]
fn test_foreign_key_column_absent_from_sqlite_message() {
    assert_eq!(parse_foreign_key_column("FOREIGN KEY constraint failed"), None);
    assert_eq!(parse_foreign_key_column("FOREIGN KEY ()"), None);
}

#[test]
fn test_foreign_key_violation_carries_column() {
    let err: PersistenceError =
        database_error(DatabaseErrorKind::ForeignKeyViolation, MYSQL_FK_MESSAGE);

    assert_eq!(err.class(), ErrorClass::ForeignKeyViolation);
    match err {
        PersistenceError::ForeignKeyViolation { column, .. } => {
            assert_eq!(column.as_deref(), Some("target_user"));
        }
        other => panic!("Expected ForeignKeyViolation, got: {other:?}"),
    }
}

#[test]
fn test_closed_connection_is_connectivity() {
    let err: PersistenceError = database_error(DatabaseErrorKind::ClosedConnection, "closed");

    assert!(err.is_connectivity());
    assert!(matches!(err, PersistenceError::ConnectionLost(_)));
}

#[test]
fn test_server_gone_away_message_is_connectivity() {
    let err: PersistenceError =
        database_error(DatabaseErrorKind::Unknown, "MySQL server has gone away");
    assert!(err.is_connectivity());

    let err: PersistenceError = database_error(
        DatabaseErrorKind::Unknown,
        "Lost connection to MySQL server during query",
    );
    assert!(err.is_connectivity());
}

#[test]
fn test_unique_violation_is_duplicate_key() {
    let err: PersistenceError = database_error(
        DatabaseErrorKind::UniqueViolation,
        "UNIQUE constraint failed: users.account",
    );

    assert_eq!(err.class(), ErrorClass::DuplicateKey);
}

#[test]
fn test_unrecognized_errors_fall_back_to_other() {
    let err: PersistenceError =
        database_error(DatabaseErrorKind::Unknown, "no such column: colour");
    assert_eq!(err.class(), ErrorClass::Other);

    assert_eq!(
        PersistenceError::from(DieselError::NotFound).class(),
        ErrorClass::NotFound
    );
}

#[test]
fn test_sqlite_foreign_key_violation_has_no_column() {
    let db: Database = create_test_database();
    let mut history: EntityAccessor = db.accessor("history");
    let record: Record = Record::new()
        .set("action_type", "User Updated")
        .set("performed_by", 1)
        .set("target_user", 4242)
        .set("description", "dangling")
        .set("created_at", "2026-03-01 12:00:00");

    match history.insert(&record) {
        Err(PersistenceError::ForeignKeyViolation { column, .. }) => assert_eq!(column, None),
        other => panic!("Expected ForeignKeyViolation, got: {other:?}"),
    }
}

#[test]
fn test_error_class_display_is_stable() {
    assert_eq!(ErrorClass::Connectivity.to_string(), "connectivity");
    assert_eq!(
        ErrorClass::ForeignKeyViolation.to_string(),
        "foreign_key_violation"
    );
    assert_eq!(ErrorClass::DuplicateKey.to_string(), "duplicate_key");
    assert_eq!(ErrorClass::Other.to_string(), "other");
}
