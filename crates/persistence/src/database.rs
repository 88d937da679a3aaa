// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Initialized database handles.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use diesel::SqliteConnection;
use tracing::info;

use crate::accessor::EntityAccessor;
use crate::backend::{mysql, sqlite};
use crate::connection::{Connector, DatabaseConfig};
use crate::error::PersistenceError;

/// Global counter for unique in-memory database names.
static DB_COUNTER: AtomicU64 = AtomicU64::new(0);

/// A migrated database from which accessors are created.
///
/// Cloning is cheap; clones share the same connector. Each accessor created
/// from it owns its own connection.
#[derive(Clone)]
pub struct Database {
    connector: Arc<dyn Connector>,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").finish_non_exhaustive()
    }
}

impl Database {
    /// Creates a fresh, migrated in-memory `SQLite` database.
    ///
    /// Each call uses a uniquely named shared-cache database, so tests stay
    /// isolated while every accessor of one handle sees the same data.
    ///
    /// # Errors
    ///
    /// Returns an error if initialization fails.
    pub fn new_in_memory() -> Result<Self, PersistenceError> {
        let db_id: u64 = DB_COUNTER.fetch_add(1, Ordering::SeqCst);
        let url: String = format!("file:memdb_stockroom_{db_id}?mode=memory&cache=shared");

        let anchor: SqliteConnection = sqlite::initialize_database(&url)?;
        info!(url = %url, "In-memory database ready");

        Ok(Self::with_config(DatabaseConfig::SqliteShared {
            url,
            anchor: Arc::new(Mutex::new(anchor)),
        }))
    }

    /// Opens (creating if needed) a migrated `SQLite` database file.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is not valid UTF-8 or initialization fails.
    pub fn new_with_file(path: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        let path: &Path = path.as_ref();
        let url: String = path
            .to_str()
            .ok_or_else(|| {
                PersistenceError::InitializationError(format!(
                    "database path is not valid UTF-8: {}",
                    path.display()
                ))
            })?
            .to_string();

        let mut conn: SqliteConnection = sqlite::initialize_database(&url)?;
        sqlite::enable_wal_mode(&mut conn)?;
        info!(path = %url, "SQLite database ready");

        Ok(Self::with_config(DatabaseConfig::SqliteFile(url)))
    }

    /// Connects to a MySQL/MariaDB server and applies migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if the server cannot be reached or migrations fail.
    pub fn new_with_mysql(database_url: &str) -> Result<Self, PersistenceError> {
        mysql::initialize_database(database_url)?;
        info!("MySQL database ready");

        Ok(Self::with_config(DatabaseConfig::Mysql(database_url.to_string())))
    }

    fn with_config(config: DatabaseConfig) -> Self {
        Self {
            connector: Arc::new(config),
        }
    }

    /// Wraps an arbitrary connector. The schema is assumed to exist.
    #[must_use]
    pub const fn with_connector(connector: Arc<dyn Connector>) -> Self {
        Self { connector }
    }

    #[must_use]
    pub fn connector(&self) -> Arc<dyn Connector> {
        Arc::clone(&self.connector)
    }

    /// Creates an accessor bound to `table`.
    #[must_use]
    pub fn accessor(&self, table: &'static str) -> EntityAccessor {
        EntityAccessor::new(self, table)
    }
}
