// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Lazy connection handling with a single reconnect-and-retry.
//!
//! Each accessor owns one [`ConnectionManager`], which in turn owns at most one
//! live [`BackendConnection`]. The handle is created on first use and replaced
//! only when an operation reports a connectivity-class failure.
//!
//! There is no pool and no timeout at this layer. Callers that need a deadline
//! enforce it around the call.

use std::sync::{Arc, Mutex};

use diesel::{MysqlConnection, SqliteConnection};
use tracing::{info, warn};

use crate::backend;
use crate::error::PersistenceError;

/// A live handle to one of the supported backends.
pub enum BackendConnection {
    Sqlite(SqliteConnection),
    Mysql(MysqlConnection),
}

impl std::fmt::Debug for BackendConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(_) => f.write_str("BackendConnection::Sqlite"),
            Self::Mysql(_) => f.write_str("BackendConnection::Mysql"),
        }
    }
}

/// Something that can open new connection handles.
pub trait Connector: Send + Sync {
    /// Opens a new, fully configured handle.
    ///
    /// # Errors
    ///
    /// Returns a connectivity-class error if the backend cannot be reached.
    fn establish(&self) -> Result<BackendConnection, PersistenceError>;
}

/// Where connections are opened.
#[derive(Clone)]
pub enum DatabaseConfig {
    /// A `SQLite` database file.
    SqliteFile(String),
    /// A named, shared-cache in-memory `SQLite` database.
    ///
    /// The anchor connection keeps the database alive while accessor handles
    /// come and go.
    SqliteShared {
        url: String,
        anchor: Arc<Mutex<SqliteConnection>>,
    },
    /// A MySQL/MariaDB connection URL.
    Mysql(String),
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SqliteFile(path) => f.debug_tuple("SqliteFile").field(path).finish(),
            Self::SqliteShared { url, anchor } => f
                .debug_struct("SqliteShared")
                .field("url", url)
                .field("anchor_refs", &Arc::strong_count(anchor))
                .finish(),
            // The URL carries credentials.
            Self::Mysql(_) => f.write_str("Mysql(..)"),
        }
    }
}

impl Connector for DatabaseConfig {
    fn establish(&self) -> Result<BackendConnection, PersistenceError> {
        match self {
            Self::SqliteFile(url) | Self::SqliteShared { url, .. } => {
                backend::sqlite::establish(url).map(BackendConnection::Sqlite)
            }
            Self::Mysql(url) => backend::mysql::establish(url).map(BackendConnection::Mysql),
        }
    }
}

/// Owns one lazily created connection handle.
pub struct ConnectionManager {
    connector: Arc<dyn Connector>,
    conn: Option<BackendConnection>,
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("connected", &self.conn.is_some())
            .finish_non_exhaustive()
    }
}

impl ConnectionManager {
    #[must_use]
    pub const fn new(connector: Arc<dyn Connector>) -> Self {
        Self {
            connector,
            conn: None,
        }
    }

    /// Returns the cached handle, establishing it on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if a new handle cannot be established.
    pub fn connect(&mut self) -> Result<&mut BackendConnection, PersistenceError> {
        let conn: BackendConnection = match self.conn.take() {
            Some(conn) => conn,
            None => {
                info!("Connecting to database");
                self.connector.establish()?
            }
        };
        Ok(self.conn.insert(conn))
    }

    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    /// Drops the cached handle, if any.
    pub fn close(&mut self) {
        if self.conn.take().is_some() {
            info!("Database connection closed");
        }
    }

    /// Runs `op` on the cached handle.
    ///
    /// If `op` fails with a connectivity-class error, the handle is discarded,
    /// a new one is established, and `op` runs exactly once more. Whatever the
    /// second attempt returns is returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns the error of the last attempt, or the error from establishing
    /// a handle.
    pub fn run<T, F>(&mut self, mut op: F) -> Result<T, PersistenceError>
    where
        F: FnMut(&mut BackendConnection) -> Result<T, PersistenceError>,
    {
        let first: Result<T, PersistenceError> = op(self.connect()?);
        match first {
            Err(err) if err.is_connectivity() => {
                warn!(error = %err, "Connection lost, reconnecting and retrying once");
                self.conn = None;
                let second: Result<T, PersistenceError> = op(self.connect()?);
                if second.as_ref().is_err_and(PersistenceError::is_connectivity) {
                    // The handle is unusable; let the next call start fresh.
                    self.conn = None;
                }
                second
            }
            other => other,
        }
    }
}
