// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Lazy connection and reconnect-once behavior.
//!
//! Connection loss is simulated by an operation that reports a
//! connectivity-class error; the connector counts how many handles were
//! established.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::create_test_database;
use crate::{
    BackendConnection, ConnectionManager, Connector, DatabaseConfig, ErrorClass, IdRow,
    PersistenceError, Query, Statement,
};

struct CountingConnector {
    inner: Arc<dyn Connector>,
    established: AtomicUsize,
}

impl CountingConnector {
    fn new(inner: Arc<dyn Connector>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            established: AtomicUsize::new(0),
        })
    }

    fn established(&self) -> usize {
        self.established.load(Ordering::SeqCst)
    }
}

impl Connector for CountingConnector {
    fn establish(&self) -> Result<BackendConnection, PersistenceError> {
        self.established.fetch_add(1, Ordering::SeqCst);
        self.inner.establish()
    }
}

fn counting_manager() -> (ConnectionManager, Arc<CountingConnector>) {
    let connector: Arc<CountingConnector> =
        CountingConnector::new(create_test_database().connector());
    let manager: ConnectionManager =
        ConnectionManager::new(Arc::clone(&connector) as Arc<dyn Connector>);
    (manager, connector)
}

fn lost() -> PersistenceError {
    PersistenceError::ConnectionLost(String::from("MySQL server has gone away"))
}

#[test]
fn test_connect_is_lazy_and_cached() {
    let (mut manager, connector) = counting_manager();
    assert!(!manager.is_connected());
    assert_eq!(connector.established(), 0);

    manager.connect().unwrap();
    manager.connect().unwrap();

    assert!(manager.is_connected());
    assert_eq!(connector.established(), 1);
}

#[test]
fn test_close_drops_handle_and_next_call_reconnects() {
    let (mut manager, connector) = counting_manager();
    manager.connect().unwrap();

    manager.close();
    assert!(!manager.is_connected());

    manager.connect().unwrap();
    assert_eq!(connector.established(), 2);
}

#[test]
fn test_connection_loss_retries_same_statement_once() {
    let (mut manager, connector) = counting_manager();
    let statement: Statement = Query::new().select(["id"]).into_select("users");
    let mut issued: Vec<Statement> = Vec::new();

    let rows: Vec<IdRow> = manager
        .run(|conn| {
            issued.push(statement.clone());
            if issued.len() == 1 {
                return Err(lost());
            }
            conn.load::<IdRow>(&statement)
        })
        .unwrap();

    assert!(rows.is_empty());
    assert_eq!(issued.len(), 2, "statement must be re-issued exactly once");
    assert_eq!(issued[0], issued[1], "retry must use identical parameters");
    assert_eq!(connector.established(), 2, "retry must use a fresh handle");
    assert!(manager.is_connected());
}

#[test]
fn test_second_connection_loss_propagates() {
    let (mut manager, connector) = counting_manager();
    let mut attempts: usize = 0;

    let result: Result<(), PersistenceError> = manager.run(|_conn| {
        attempts += 1;
        Err(lost())
    });

    assert_eq!(attempts, 2, "no third attempt after a second failure");
    match result {
        Err(err) => assert_eq!(err.class(), ErrorClass::Connectivity),
        Ok(()) => panic!("Expected a connectivity error"),
    }
    assert_eq!(connector.established(), 2);
    assert!(!manager.is_connected(), "an unusable handle is discarded");
}

#[test]
fn test_non_connectivity_errors_are_not_retried() {
    let (mut manager, connector) = counting_manager();
    let mut attempts: usize = 0;

    let result: Result<(), PersistenceError> = manager.run(|_conn| {
        attempts += 1;
        Err(PersistenceError::DuplicateKey(String::from("account")))
    });

    assert_eq!(attempts, 1);
    assert_eq!(
        result,
        Err(PersistenceError::DuplicateKey(String::from("account")))
    );
    assert_eq!(connector.established(), 1);
    assert!(manager.is_connected(), "the handle is still usable");
}

#[test]
fn test_unreachable_database_is_a_connectivity_error() {
    let config: DatabaseConfig =
        DatabaseConfig::SqliteFile(String::from("/nonexistent-stockroom-dir/inventory.db"));
    let mut manager: ConnectionManager = ConnectionManager::new(Arc::new(config));

    match manager.connect() {
        Err(err) => {
            assert_eq!(err.class(), ErrorClass::Connectivity);
            assert!(matches!(err, PersistenceError::DatabaseConnectionFailed(_)));
        }
        Ok(conn) => panic!("Expected connection failure, got: {conn:?}"),
    }
    assert!(!manager.is_connected());
}
