// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Backend initialization tests.
//!
//! Every other test module exercises `Database::new_in_memory()` implicitly;
//! these cover isolation, file-backed databases and per-connection
//! foreign-key enforcement explicitly.

use std::path::PathBuf;

use diesel::SqliteConnection;

use super::{create_test_database, create_test_product};
use crate::backend::sqlite;
use crate::{BackendConnection, Database, PersistenceError, Products};

#[test]
fn test_in_memory_initialization() {
    let result: Result<Database, PersistenceError> = Database::new_in_memory();
    assert!(result.is_ok());
}

#[test]
fn test_multiple_in_memory_instances_are_isolated() {
    let db1: Database = create_test_database();
    let db2: Database = create_test_database();

    create_test_product(&db1, "ONLY-IN-DB1");

    assert_eq!(Products::new(&db1).list().unwrap().len(), 1);
    assert_eq!(Products::new(&db2).list().unwrap().len(), 0);
}

#[test]
fn test_every_connection_enforces_foreign_keys() {
    let db: Database = create_test_database();

    let conn: BackendConnection = db.connector().establish().unwrap();
    match conn {
        BackendConnection::Sqlite(mut conn) => {
            sqlite::verify_foreign_key_enforcement(&mut conn).unwrap();
        }
        BackendConnection::Mysql(_) => panic!("Expected a SQLite connection"),
    }
}

#[test]
fn test_file_database_persists_across_handles() {
    let path: PathBuf = std::env::temp_dir().join(format!(
        "stockroom-init-test-{}.db",
        std::process::id()
    ));
    let _ = std::fs::remove_file(&path);

    let id: i64 = {
        let db: Database = Database::new_with_file(&path).unwrap();
        create_test_product(&db, "DURABLE-1")
    };

    let reopened: Database = Database::new_with_file(&path).unwrap();
    assert!(Products::new(&reopened).exists(id).unwrap());

    drop(reopened);
    let _ = std::fs::remove_file(&path);
    let _ = std::fs::remove_file(path.with_extension("db-wal"));
    let _ = std::fs::remove_file(path.with_extension("db-shm"));
}

#[test]
fn test_migrations_are_idempotent() {
    let mut conn: SqliteConnection =
        sqlite::initialize_database("file:memdb_stockroom_idempotent?mode=memory&cache=shared")
            .unwrap();
    sqlite::run_migrations(&mut conn).unwrap();
}
